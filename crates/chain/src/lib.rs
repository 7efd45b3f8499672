//! Leverage loop chain interaction layer.
//!
//! This crate provides:
//! - The lending-market contract consumed by the core (`LendingMarket`)
//! - Record types for obligations, market snapshots and coin metadata
//! - Sui full-node JSON-RPC reads (objects, coin metadata, balances)
//! - Oracle price decoding (Pyth feed objects) behind a feed registry
//! - A single chain error taxonomy shared by every adapter

mod error;
pub mod oracle;
pub mod protocol;
mod provider;

pub use error::ChainError;
pub use oracle::{
    decode_pyth_price, OracleProvider, OracleSource, PriceFeed, PriceQuote, PriceReader,
};
pub use protocol::{
    CoinMetadata, CoinType, CollateralEntry, CollateralPoolRecord, DebtEntry, LendingMarket,
    MarketSnapshot, AssetMarketRecord, Obligation, ObligationRef, SuiAddress, TransactionDigest,
};
pub use provider::SuiRpcClient;
