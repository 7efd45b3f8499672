//! Configuration system for the leverage loop.
//!
//! This module provides:
//! - Bot runtime configuration (profiles, sizing margins, cycle pacing)
//! - Asset configuration (coin types, oracle feeds)
//! - Deployment configuration (endpoints, owner, bot overrides)
//! - A loader resolving a named deployment into runtime values

mod asset_config;
mod bot;
mod deployment;
mod loader;

pub use crate::selector::SelectionPolicy;

// Re-export bot config (main runtime config)
pub use bot::{
    config, init_config, BotConfig, CycleConfig, SelectionConfig, SizingConfig, StrategyConfig,
};

// Re-export asset config
pub use asset_config::{AssetConfig, AssetsConfig};

// Re-export deployment config
pub use deployment::{
    BotConfigOverrides, CycleOverrides, DeploymentConfig, DeploymentDetails, SelectionOverrides,
    SizingOverrides, StrategyOverrides,
};

// Re-export deployment loader
pub use loader::{
    expand_env, load_deployment, load_deployment_from_env, DeploymentLoader, ResolvedAsset,
    ResolvedDeployment,
};
