//! Record types exchanged with the lending market.

use crate::ChainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Fully-qualified Move coin type (e.g. `0x2::sui::SUI`).
///
/// Obligation records report `TypeName`s with a bare, zero-padded 64-digit
/// address while market tables, coin metadata and config use the short
/// `0x`-prefixed form. Construction canonicalizes the package address to
/// `0x` + lowercase hex without leading zeros, so lookups across sources agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CoinType(String);

impl CoinType {
    /// Create a coin type with a canonical package address.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().trim();
        let body = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        let (address, path) = body.split_at(body.find("::").unwrap_or(body.len()));

        let trimmed = address.trim_start_matches('0');
        let address = if trimmed.is_empty() { "0" } else { trimmed };
        Self(format!("0x{}{path}", address.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CoinType {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for CoinType {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<CoinType> for String {
    fn from(coin_type: CoinType) -> Self {
        coin_type.0
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32-byte Sui account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuiAddress([u8; 32]);

impl SuiAddress {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn repeat_byte(byte: u8) -> Self {
        Self([byte; 32])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for SuiAddress {
    type Err = ChainError;

    /// Parse `0x`-prefixed hex, left-padding short addresses (`0x2`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .strip_prefix("0x")
            .ok_or_else(|| ChainError::decode(format!("address '{s}' missing 0x prefix")))?;
        if digits.is_empty() || digits.len() > 64 {
            return Err(ChainError::decode(format!("address '{s}' has invalid length")));
        }
        let padded = format!("{digits:0>64}");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| ChainError::decode(format!("address '{s}': {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for SuiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Obligation identity plus the key object authorizing mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObligationRef {
    pub id: String,
    pub key_id: String,
}

/// Collateral deposited into an obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralEntry {
    pub coin_type: CoinType,
    /// Raw amount in smallest on-chain units
    pub amount: u64,
}

/// Debt outstanding on an obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtEntry {
    pub coin_type: CoinType,
    /// Raw principal in smallest on-chain units, as of `borrow_index`
    pub amount: u64,
    /// Borrow index snapshot taken when the debt was last settled
    pub borrow_index: Decimal,
}

/// A user's collateral and debt position on the lending market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obligation {
    pub id: String,
    pub key_id: String,
    pub collaterals: SmallVec<[CollateralEntry; 4]>,
    pub debts: SmallVec<[DebtEntry; 4]>,
}

impl Obligation {
    /// Create an empty obligation for a reference.
    pub fn new(reference: &ObligationRef) -> Self {
        Self {
            id: reference.id.clone(),
            key_id: reference.key_id.clone(),
            collaterals: SmallVec::new(),
            debts: SmallVec::new(),
        }
    }

    pub fn has_collateral(&self) -> bool {
        !self.collaterals.is_empty()
    }

    pub fn reference(&self) -> ObligationRef {
        ObligationRef {
            id: self.id.clone(),
            key_id: self.key_id.clone(),
        }
    }
}

/// Borrowable asset pool parameters as reported by the market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMarketRecord {
    /// Market symbol (e.g. "usdc")
    pub coin: String,
    pub coin_type: CoinType,
    /// Debt risk multiplier (>= 1)
    pub borrow_weight: Decimal,
    /// Current interest accrual index
    pub current_borrow_index: Decimal,
}

/// Collateral pool parameters as reported by the market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralPoolRecord {
    pub coin: String,
    pub coin_type: CoinType,
    /// Maximum loan-to-value fraction
    pub collateral_factor: Decimal,
    /// Liquidation threshold fraction
    pub liquidation_factor: Decimal,
}

/// Raw market snapshot, one read per cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub assets: Vec<AssetMarketRecord>,
    pub collaterals: Vec<CollateralPoolRecord>,
}

/// Coin metadata (decimal exponent for unit conversion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinMetadata {
    pub decimals: u8,
    pub symbol: String,
}

/// Digest of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionDigest(pub String);

impl fmt::Display for TransactionDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_type_prefix_normalization() {
        let bare = CoinType::new(
            "5d4b302506645c37ff133b98c4b50a5ae14841659738d6d733d59d0d217a93bf::coin::COIN",
        );
        let prefixed = CoinType::new(
            "0x5d4b302506645c37ff133b98c4b50a5ae14841659738d6d733d59d0d217a93bf::coin::COIN",
        );
        assert_eq!(bare, prefixed);
        assert!(bare.as_str().starts_with("0x5d4b"));
    }

    #[test]
    fn test_coin_type_address_padding_normalized() {
        let short = CoinType::new("0x2::sui::SUI");
        let padded = CoinType::new(format!("{}2::sui::SUI", "0".repeat(63)));
        let padded_prefixed = CoinType::new(format!("0x{}2::sui::SUI", "0".repeat(63)));
        assert_eq!(padded, short);
        assert_eq!(padded_prefixed, short);
        assert_eq!(padded.as_str(), "0x2::sui::SUI");

        assert_eq!(CoinType::new("0x00AB::coin::COIN").as_str(), "0xab::coin::COIN");
        assert_eq!(CoinType::new("0x0::m::T").as_str(), "0x0::m::T");
        assert_eq!(CoinType::new("000::m::T").as_str(), "0x0::m::T");
    }

    #[test]
    fn test_coin_type_serde_normalizes() {
        let parsed: CoinType = serde_json::from_str("\"2::sui::SUI\"").unwrap();
        assert_eq!(parsed.as_str(), "0x2::sui::SUI");
    }

    #[test]
    fn test_sui_address_parsing() {
        let short: SuiAddress = "0x2".parse().unwrap();
        assert_eq!(short.as_bytes()[31], 2);
        assert_eq!(
            short.to_string(),
            "0x0000000000000000000000000000000000000000000000000000000000000002"
        );

        assert!("2".parse::<SuiAddress>().is_err());
        assert!("0x".parse::<SuiAddress>().is_err());
        assert!("0xzz".parse::<SuiAddress>().is_err());
        assert!(format!("0x{}", "1".repeat(65)).parse::<SuiAddress>().is_err());
    }

    #[test]
    fn test_obligation_reference_roundtrip() {
        let reference = ObligationRef {
            id: "0xabc".to_string(),
            key_id: "0xdef".to_string(),
        };
        let obligation = Obligation::new(&reference);
        assert!(!obligation.has_collateral());
        assert_eq!(obligation.reference(), reference);
    }
}
