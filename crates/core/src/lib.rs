//! Leverage loop core logic.
//!
//! This crate provides the calculation engine and the loop driving it:
//! - Asset registry with oracle feed configuration
//! - Market data aggregation (asset pools, collateral pools)
//! - Position valuation (collateral, accrued debt, borrow capacity)
//! - Borrow sizing with safety margins
//! - Obligation selection policies
//! - The cancellable deposit/borrow loop
//! - The Scallop market adapter over the gateway and Sui RPC
//!
//! All monetary math is fixed-point `Decimal`.

mod assets;
pub mod config;
pub mod decimal_math;
mod error;
mod leverage_loop;
mod market;
mod scallop;
mod selector;
mod sizing;
mod valuator;

#[cfg(test)]
mod testing;

pub use assets::{Asset, AssetRegistry};
pub use config::{
    config, init_config, load_deployment, load_deployment_from_env, BotConfig, ResolvedAsset,
    ResolvedDeployment,
};
pub use error::{CycleError, MathError, SizingError, ValuationError};
pub use leverage_loop::{CycleReport, LeverageLoop, LoopSummary, StopSignal};
pub use market::{fetch_market_data, MarketData};
pub use scallop::ScallopMarket;
pub use selector::{select_obligation, SelectionPolicy};
pub use sizing::{size_borrow, SizingParams};
pub use valuator::{
    collateral_value, valuate, PositionValuator, SkipReason, SkippedCollateral, Valuation,
    ValuationInputs,
};
