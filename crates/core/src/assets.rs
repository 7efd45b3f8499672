//! Asset registry built from the deployment's asset configuration.
//!
//! Maps market coin names and coin types to their price feeds. The loop
//! uses it to resolve the deposit and borrow assets and to seed the
//! oracle provider's feed table.

use crate::config::ResolvedAsset;
use leverage_chain::{CoinType, OracleProvider, PriceFeed};
use std::collections::HashMap;
use tracing::{debug, info};

/// One tradable asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Market coin name (e.g., "usdc")
    pub symbol: String,
    /// Normalized coin type
    pub coin_type: CoinType,
    /// Where its price is read
    pub feed: PriceFeed,
    /// Inactive assets are kept for lookups but get no feed
    pub active: bool,
}

impl From<&ResolvedAsset> for Asset {
    fn from(resolved: &ResolvedAsset) -> Self {
        Self {
            symbol: resolved.symbol.clone(),
            coin_type: resolved.coin_type.clone(),
            feed: resolved.feed.clone(),
            active: resolved.active,
        }
    }
}

/// Asset registry for lookups by symbol or coin type.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: Vec<Asset>,
    by_symbol: HashMap<String, usize>,
    by_coin_type: HashMap<CoinType, usize>,
}

impl AssetRegistry {
    /// Build a registry. Later duplicates of a symbol or coin type are ignored.
    pub fn new(assets: impl IntoIterator<Item = Asset>) -> Self {
        let mut registry = Self::default();
        for asset in assets {
            if registry.by_symbol.contains_key(&asset.symbol.to_lowercase())
                || registry.by_coin_type.contains_key(&asset.coin_type)
            {
                debug!(symbol = %asset.symbol, "Duplicate asset ignored");
                continue;
            }
            let idx = registry.assets.len();
            registry.by_symbol.insert(asset.symbol.to_lowercase(), idx);
            registry.by_coin_type.insert(asset.coin_type.clone(), idx);
            registry.assets.push(asset);
        }
        registry
    }

    /// Build from resolved deployment assets.
    pub fn from_resolved(assets: &[ResolvedAsset]) -> Self {
        Self::new(assets.iter().map(Asset::from))
    }

    /// Get asset by symbol (case-insensitive).
    pub fn get_by_symbol(&self, symbol: &str) -> Option<&Asset> {
        self.by_symbol
            .get(&symbol.to_lowercase())
            .map(|&idx| &self.assets[idx])
    }

    /// Get asset by coin type.
    pub fn get_by_coin_type(&self, coin_type: &CoinType) -> Option<&Asset> {
        self.by_coin_type
            .get(coin_type)
            .map(|&idx| &self.assets[idx])
    }

    /// Get all active assets.
    pub fn active_assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(|a| a.active)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Register the feed of every active asset with the oracle provider.
    pub fn register_feeds(&self, oracle: &OracleProvider) -> usize {
        let mut count = 0;
        for asset in self.active_assets() {
            oracle.register_feed(asset.coin_type.clone(), asset.feed.clone());
            count += 1;
        }
        info!(feeds = count, "Price feeds registered");
        count
    }
}
