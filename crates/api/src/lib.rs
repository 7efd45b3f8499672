//! HTTP client for the lending-market gateway.
//!
//! The gateway is a signing sidecar that owns the wallet and speaks the
//! lending market's SDK. This crate maps its JSON endpoints:
//! - Obligation discovery and detail
//! - Market snapshot (asset pools and collateral pools)
//! - Collateral deposit and borrow submission

mod gateway;
mod types;

pub use gateway::{GatewayClient, GatewayError};
pub use types::{
    AssetCalculated, AssetOrigin, AssetPool, BorrowRequest, CollateralOrigin, CollateralPool,
    DepositRequest, MarketResponse, ObligationCollateral, ObligationDebt, ObligationDetail,
    ObligationSummary, TransactionResponse, TypeName,
};
