//! Oracle provider resolving coin types to registered price feeds.

use super::{decode_pyth_price, OracleSource, PriceFeed, PriceQuote, PriceReader};
use crate::protocol::{CoinType, LendingMarket};
use crate::ChainError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Oracle provider: feed registry plus decoding.
///
/// Feeds are injected at startup from the asset registry, so adding an asset
/// or a feed is a configuration change. Prices are never cached; every call
/// reads the feed object fresh.
pub struct OracleProvider {
    /// Market used to read feed objects
    market: Arc<dyn LendingMarket>,
    /// Registered feed per coin type
    feeds: DashMap<CoinType, PriceFeed>,
}

impl std::fmt::Debug for OracleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleProvider")
            .field("market", &self.market.market_id())
            .field("feed_count", &self.feeds.len())
            .finish()
    }
}

impl OracleProvider {
    /// Create an oracle provider with no registered feeds.
    pub fn new(market: Arc<dyn LendingMarket>) -> Self {
        Self {
            market,
            feeds: DashMap::new(),
        }
    }

    /// Register (or replace) the feed for a coin type.
    pub fn register_feed(&self, coin_type: CoinType, feed: PriceFeed) {
        debug!(coin_type = %coin_type, feed = %feed.feed_id, source = feed.source.as_str(), "Registered price feed");
        self.feeds.insert(coin_type, feed);
    }

    /// Get the registered feed for a coin type.
    pub fn feed_for(&self, coin_type: &CoinType) -> Option<PriceFeed> {
        self.feeds.get(coin_type).map(|f| f.clone())
    }

    /// Number of registered feeds.
    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    /// Read and decode the price from a specific feed.
    #[instrument(skip(self), fields(feed = %feed.feed_id))]
    pub async fn get_price_from(&self, feed: &PriceFeed) -> Result<PriceQuote, ChainError> {
        match feed.source {
            OracleSource::Pyth => {
                let Some(fields) = self.market.get_price_feed_object(&feed.feed_id).await? else {
                    warn!(feed = %feed.feed_id, "Price feed object not found");
                    return Ok(PriceQuote::Unavailable);
                };
                let price = decode_pyth_price(&fields)?;
                debug!(price = %price, "Decoded pyth price");
                Ok(PriceQuote::Available(price))
            }
        }
    }
}

#[async_trait]
impl PriceReader for OracleProvider {
    async fn get_price(&self, coin_type: &CoinType) -> Result<PriceQuote, ChainError> {
        let Some(feed) = self.feed_for(coin_type) else {
            debug!(coin_type = %coin_type, "No price feed registered");
            return Ok(PriceQuote::Unavailable);
        };
        self.get_price_from(&feed).await
    }
}
