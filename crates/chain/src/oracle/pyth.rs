//! Pyth price feed object decoding.

use crate::ChainError;
use rust_decimal::Decimal;
use serde_json::Value;

/// Largest decimal scale representable by `Decimal`.
const MAX_SCALE: u32 = 28;

/// Decode the USD price from the structured fields of a Pyth
/// `PriceInfoObject`.
///
/// The price lives at
/// `price_info.fields.price_feed.fields.price.fields`, where both `price`
/// and `expo` are signed integers encoded as `{magnitude, negative}`.
/// The result is `magnitude × 10^(±expo)`, negated when the price is negative.
/// Negative prices are rejected since USD quotes must be non-negative.
pub fn decode_pyth_price(fields: &Value) -> Result<Decimal, ChainError> {
    let price = fields
        .pointer("/price_info/fields/price_feed/fields/price/fields")
        .ok_or_else(|| ChainError::decode("pyth object missing price_info.price_feed.price"))?;

    let (mantissa, mantissa_negative) = signed_field(price, "price")?;
    let (exponent, exponent_negative) = signed_field(price, "expo")?;

    let exponent = u32::try_from(exponent)
        .map_err(|_| ChainError::decode(format!("pyth exponent {exponent} out of range")))?;

    let magnitude = if exponent_negative {
        if exponent > MAX_SCALE {
            return Err(ChainError::decode(format!(
                "pyth exponent -{exponent} exceeds decimal precision"
            )));
        }
        Decimal::from_i128_with_scale(i128::from(mantissa), exponent)
    } else {
        let factor = pow10(exponent)
            .ok_or_else(|| ChainError::decode(format!("pyth exponent {exponent} too large")))?;
        Decimal::from(mantissa)
            .checked_mul(factor)
            .ok_or_else(|| ChainError::decode("pyth price overflows decimal range"))?
    };

    if mantissa_negative && !magnitude.is_zero() {
        return Err(ChainError::decode(format!("pyth price is negative (-{magnitude})")));
    }

    Ok(magnitude.normalize())
}

/// Read an `I64 { magnitude, negative }` field.
fn signed_field(parent: &Value, name: &str) -> Result<(u64, bool), ChainError> {
    let inner = parent
        .get(name)
        .and_then(|v| v.get("fields"))
        .ok_or_else(|| ChainError::decode(format!("pyth price missing '{name}' field")))?;

    let magnitude = inner
        .get("magnitude")
        .and_then(json_u64)
        .ok_or_else(|| ChainError::decode(format!("pyth '{name}' has no numeric magnitude")))?;
    let negative = inner
        .get("negative")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok((magnitude, negative))
}

/// Sui renders u64 values as JSON strings; accept both forms.
fn json_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn pow10(exp: u32) -> Option<Decimal> {
    if exp > MAX_SCALE {
        return None;
    }
    Some(Decimal::from_i128_with_scale(10i128.pow(exp), 0))
}
