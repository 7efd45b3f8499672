//! Oracle price adapter.
//!
//! # Architecture
//!
//! - [`PriceReader`]: the price lookup the valuator depends on
//! - [`OracleProvider`]: resolves a coin type to its registered feed, fetches
//!   the feed object through the lending market and decodes it
//! - [`decode_pyth_price`]: Pyth `PriceInfoObject` field decoding
//!
//! A missing feed registration or a missing feed object yields
//! [`PriceQuote::Unavailable`]; a feed that reports zero yields
//! `PriceQuote::Available(0)`. The two are never conflated.

mod provider;
mod pyth;
mod types;

pub use provider::OracleProvider;
pub use pyth::decode_pyth_price;
pub use types::{OracleSource, PriceFeed, PriceQuote};

use crate::protocol::CoinType;
use crate::ChainError;
use async_trait::async_trait;

/// Price lookup by coin type.
#[async_trait]
pub trait PriceReader: Send + Sync {
    /// Current USD price of `coin_type`.
    ///
    /// Transport and decode failures are errors; an unknown or missing feed
    /// is `Ok(PriceQuote::Unavailable)`.
    async fn get_price(&self, coin_type: &CoinType) -> Result<PriceQuote, ChainError>;
}
