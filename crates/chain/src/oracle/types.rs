//! Oracle type definitions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Oracle source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OracleSource {
    /// Pyth pull oracle (`PriceInfoObject` on Sui)
    #[default]
    Pyth,
}

impl OracleSource {
    /// Parse oracle source from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pyth" | "pyth-network" => Some(Self::Pyth),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pyth => "pyth",
        }
    }
}

/// Where to read the price of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceFeed {
    /// Oracle source kind
    pub source: OracleSource,
    /// On-chain feed object id
    pub feed_id: String,
}

impl PriceFeed {
    pub fn pyth(feed_id: impl Into<String>) -> Self {
        Self {
            source: OracleSource::Pyth,
            feed_id: feed_id.into(),
        }
    }
}

/// Result of a price lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceQuote {
    /// Decoded USD price (may legitimately be zero)
    Available(Decimal),
    /// No feed registered or the feed object could not be located
    Unavailable,
}

impl PriceQuote {
    pub fn price(&self) -> Option<Decimal> {
        match self {
            Self::Available(price) => Some(*price),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}
