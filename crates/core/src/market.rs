//! Market data aggregation.
//!
//! Turns one market snapshot into lookup tables keyed by coin type. Fetched
//! fresh each cycle; nothing is cached between calls.

use leverage_chain::{
    AssetMarketRecord, ChainError, CoinType, CollateralPoolRecord, LendingMarket, MarketSnapshot,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Per-asset market parameters keyed by coin type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketData {
    pub assets: HashMap<CoinType, AssetMarketRecord>,
    pub collaterals: HashMap<CoinType, CollateralPoolRecord>,
}

impl MarketData {
    /// Build lookup tables from a snapshot.
    ///
    /// Asset records with a non-positive borrow index are dropped. For
    /// duplicate coin types the first record wins.
    pub fn from_snapshot(snapshot: MarketSnapshot) -> Self {
        let mut assets = HashMap::with_capacity(snapshot.assets.len());
        for record in snapshot.assets {
            if record.current_borrow_index <= Decimal::ZERO {
                warn!(
                    coin_type = %record.coin_type,
                    index = %record.current_borrow_index,
                    "Dropping asset with non-positive borrow index"
                );
                continue;
            }
            if assets.contains_key(&record.coin_type) {
                warn!(coin_type = %record.coin_type, "Duplicate asset market record ignored");
                continue;
            }
            assets.insert(record.coin_type.clone(), record);
        }

        let mut collaterals = HashMap::with_capacity(snapshot.collaterals.len());
        for record in snapshot.collaterals {
            if collaterals.contains_key(&record.coin_type) {
                warn!(coin_type = %record.coin_type, "Duplicate collateral pool record ignored");
                continue;
            }
            collaterals.insert(record.coin_type.clone(), record);
        }

        Self {
            assets,
            collaterals,
        }
    }

    pub fn asset(&self, coin_type: &CoinType) -> Option<&AssetMarketRecord> {
        self.assets.get(coin_type)
    }

    pub fn collateral_pool(&self, coin_type: &CoinType) -> Option<&CollateralPoolRecord> {
        self.collaterals.get(coin_type)
    }
}

/// Fetch and normalize the market snapshot. One external read, no retry.
#[instrument(skip(market), fields(market = market.market_id()))]
pub async fn fetch_market_data(market: &dyn LendingMarket) -> Result<MarketData, ChainError> {
    let snapshot = market.query_market_snapshot().await?;
    let data = MarketData::from_snapshot(snapshot);
    debug!(
        assets = data.assets.len(),
        collaterals = data.collaterals.len(),
        "Market data aggregated"
    );
    Ok(data)
}
