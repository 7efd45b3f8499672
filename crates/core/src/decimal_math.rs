//! Fixed-point helpers over `rust_decimal::Decimal`.
//!
//! Every arithmetic step of the valuation and sizing pipeline goes through
//! these checked wrappers so an overflow surfaces as [`MathError`] instead
//! of a panic. `Decimal` carries a 96-bit mantissa with a scale of at most
//! 28, which bounds the supported power-of-ten shifts.

use crate::MathError;
use rust_decimal::Decimal;

/// Largest scale `Decimal` can represent.
pub const MAX_SCALE: u32 = 28;

/// Pre-computed powers of ten up to 10^28.
const POW10: [u128; 29] = {
    let mut table = [1u128; 29];
    let mut i = 1;
    while i < 29 {
        table[i] = table[i - 1] * 10;
        i += 1;
    }
    table
};

/// 10^exp as a decimal.
#[inline]
pub fn pow10(exp: u32) -> Result<Decimal, MathError> {
    if exp > MAX_SCALE {
        return Err(MathError::ScaleOutOfRange(exp as i32));
    }
    Decimal::try_from_i128_with_scale(POW10[exp as usize] as i128, 0)
        .map_err(|_| MathError::Overflow)
}

/// Raw on-chain units to whole-token amount: `raw × 10^-decimals`. Exact.
pub fn normalize_amount(raw: u64, decimals: u8) -> Result<Decimal, MathError> {
    if u32::from(decimals) > MAX_SCALE {
        return Err(MathError::ScaleOutOfRange(-i32::from(decimals)));
    }
    Decimal::try_from_i128_with_scale(i128::from(raw), u32::from(decimals))
        .map_err(|_| MathError::Overflow)
}

/// Whole-token amount to raw units: `floor(amount × 10^decimals)`.
///
/// Works on the mantissa directly so the shift never loses precision.
/// Negative amounts and results beyond `u64` are overflow errors.
pub fn to_raw_units(amount: Decimal, decimals: u8) -> Result<u64, MathError> {
    let target = u32::from(decimals);
    if target > MAX_SCALE {
        return Err(MathError::ScaleOutOfRange(i32::from(decimals)));
    }
    let mantissa = amount.mantissa();
    let scale = amount.scale();

    let raw = if target >= scale {
        mantissa
            .checked_mul(POW10[(target - scale) as usize] as i128)
            .ok_or(MathError::Overflow)?
    } else {
        mantissa.div_euclid(POW10[(scale - target) as usize] as i128)
    };
    u64::try_from(raw).map_err(|_| MathError::Overflow)
}

#[inline]
pub fn add(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

#[inline]
pub fn sub(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}

#[inline]
pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

#[inline]
pub fn div(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    a.checked_div(b).ok_or(MathError::Overflow)
}
