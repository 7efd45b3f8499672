//! Lending market contract consumed by the core.
//!
//! The core never talks to a node or gateway directly. Everything it reads
//! or submits goes through [`LendingMarket`], so the calculation engine can
//! be driven by the Sui adapters in production and by an in-memory market in
//! tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use leverage_chain::protocol::LendingMarket;
//!
//! let refs = market.list_obligations(&owner).await?;
//! let obligation = market.query_obligation(&refs[0]).await?;
//! let snapshot = market.query_market_snapshot().await?;
//! ```

mod types;

pub use types::{
    AssetMarketRecord, CoinMetadata, CoinType, CollateralEntry, CollateralPoolRecord, DebtEntry,
    MarketSnapshot, Obligation, ObligationRef, SuiAddress, TransactionDigest,
};

use crate::ChainError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Request/response contract with the lending market and its ledger.
///
/// Implementations perform exactly one external call per method and never
/// retry; retry policy belongs to the orchestrator.
#[async_trait]
pub trait LendingMarket: Send + Sync + Debug {
    /// Human-readable identifier for logs (e.g. "scallop-mainnet").
    fn market_id(&self) -> &str;

    /// List the obligations owned by `owner`.
    async fn list_obligations(&self, owner: &SuiAddress) -> Result<Vec<ObligationRef>, ChainError>;

    /// Fetch full collateral/debt detail for one obligation.
    async fn query_obligation(&self, obligation: &ObligationRef) -> Result<Obligation, ChainError>;

    /// Fetch the raw market snapshot (asset pools and collateral pools).
    async fn query_market_snapshot(&self) -> Result<MarketSnapshot, ChainError>;

    /// Fetch coin metadata. `None` when the ledger knows no such coin.
    async fn get_coin_metadata(
        &self,
        coin_type: &CoinType,
    ) -> Result<Option<CoinMetadata>, ChainError>;

    /// Fetch the structured fields of an oracle feed object. `None` when the
    /// object does not exist.
    async fn get_price_feed_object(
        &self,
        feed_id: &str,
    ) -> Result<Option<serde_json::Value>, ChainError>;

    /// Wallet balance of `coin_type` in smallest units.
    async fn get_balance(&self, owner: &SuiAddress, coin_type: &CoinType)
        -> Result<u64, ChainError>;

    /// Deposit `amount` of `coin_symbol` as collateral into `obligation_id`.
    async fn submit_deposit_collateral(
        &self,
        coin_symbol: &str,
        amount: u64,
        raw_units: bool,
        obligation_id: &str,
    ) -> Result<TransactionDigest, ChainError>;

    /// Borrow `amount` of `coin_symbol` against `obligation_id`.
    async fn submit_borrow(
        &self,
        coin_symbol: &str,
        amount: u64,
        raw_units: bool,
        obligation_id: &str,
        key_id: &str,
    ) -> Result<TransactionDigest, ChainError>;
}
