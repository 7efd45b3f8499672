//! Borrow sizing: USD capacity to an integer amount of the target asset.

use crate::config::SizingConfig;
use crate::decimal_math::{div, mul, sub, to_raw_units};
use crate::SizingError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Safety margins applied while sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingParams {
    /// USD subtracted from capacity before conversion
    pub buffer_usd: Decimal,
    /// Final multiplier on the weighted amount
    pub safety_multiplier: Decimal,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            buffer_usd: dec!(0.1),
            safety_multiplier: dec!(0.99),
        }
    }
}

impl From<&SizingConfig> for SizingParams {
    fn from(config: &SizingConfig) -> Self {
        Self {
            buffer_usd: config.buffer_usd,
            safety_multiplier: config.safety_multiplier,
        }
    }
}

/// Raw units of the target asset to borrow.
///
/// `floor((capacity − buffer) / price × borrowWeight × multiplier × 10^decimals)`,
/// or 0 when the capacity does not exceed the buffer.
pub fn size_borrow(
    available_capacity: Decimal,
    target_price: Decimal,
    target_borrow_weight: Decimal,
    target_decimals: u8,
    params: &SizingParams,
) -> Result<u64, SizingError> {
    if target_price <= Decimal::ZERO {
        return Err(SizingError::NonPositivePrice);
    }

    let margined = sub(available_capacity, params.buffer_usd)?;
    if margined <= Decimal::ZERO {
        return Ok(0);
    }

    let units = div(margined, target_price)?;
    let weighted = mul(units, target_borrow_weight)?;
    let safe = mul(weighted, params.safety_multiplier)?;
    if safe <= Decimal::ZERO {
        return Ok(0);
    }
    Ok(to_raw_units(safe, target_decimals)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MathError;

    #[test]
    fn test_reference_sizing() {
        let raw = size_borrow(dec!(1000), dec!(1), dec!(1), 6, &SizingParams::default()).unwrap();
        assert_eq!(raw, 989_901_000);
    }

    #[test]
    fn test_clamps_at_buffer() {
        let params = SizingParams::default();
        assert_eq!(size_borrow(dec!(0.1), dec!(1), dec!(1), 6, &params).unwrap(), 0);
        assert_eq!(size_borrow(dec!(0.05), dec!(1), dec!(1), 6, &params).unwrap(), 0);
        assert_eq!(size_borrow(Decimal::ZERO, dec!(1), dec!(1), 6, &params).unwrap(), 0);
    }

    #[test]
    fn test_price_and_weight() {
        // (100.1 - 0.1) / 2 * 1.25 * 0.99 = 61.875 SUI
        let raw = size_borrow(dec!(100.1), dec!(2), dec!(1.25), 9, &SizingParams::default()).unwrap();
        assert_eq!(raw, 61_875_000_000);
    }

    #[test]
    fn test_rounds_down() {
        // (1.1 - 0.1) * 0.99 = 0.99, one decimal place keeps 9
        let raw = size_borrow(dec!(1.1), dec!(1), dec!(1), 1, &SizingParams::default()).unwrap();
        assert_eq!(raw, 9);
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let params = SizingParams::default();
        assert_eq!(
            size_borrow(dec!(10), Decimal::ZERO, dec!(1), 6, &params),
            Err(SizingError::NonPositivePrice)
        );
        assert_eq!(
            size_borrow(dec!(10), dec!(-1), dec!(1), 6, &params),
            Err(SizingError::NonPositivePrice)
        );
    }

    #[test]
    fn test_overflow_surfaces() {
        let err = size_borrow(Decimal::MAX, dec!(0.0000001), dec!(1), 6, &SizingParams::default());
        assert_eq!(err, Err(SizingError::Math(MathError::Overflow)));
    }

    #[test]
    fn test_params_from_config() {
        let params = SizingParams::from(&SizingConfig {
            buffer_usd: dec!(2),
            safety_multiplier: dec!(0.5),
        });
        // (12 - 2) / 1 * 1 * 0.5 = 5
        assert_eq!(size_borrow(dec!(12), dec!(1), dec!(1), 0, &params).unwrap(), 5);
    }
}
