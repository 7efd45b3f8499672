//! Deployment configuration tying network endpoints, assets and bot overrides.

use super::{BotConfig, SelectionPolicy};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployment metadata
    pub deployment: DeploymentDetails,
    /// Bot configuration overrides
    #[serde(default)]
    pub bot: Option<BotConfigOverrides>,
}

/// Deployment details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentDetails {
    /// Deployment name (e.g., "scallop-mainnet")
    pub name: String,
    /// Network label (e.g., "mainnet", "testnet")
    #[serde(default = "default_network")]
    pub network: String,
    /// Lending market identifier used in logs
    #[serde(default = "default_market")]
    pub market: String,
    /// Assets config file name (without extension)
    pub assets: String,
    /// Sui full node JSON-RPC URL
    pub rpc_url: String,
    /// Lending-market gateway base URL
    pub gateway_url: String,
    /// Wallet address owning the obligations
    pub owner: String,
}

fn default_network() -> String {
    "mainnet".to_string()
}

fn default_market() -> String {
    "scallop".to_string()
}

/// Bot configuration overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfigOverrides {
    /// Base profile the overrides apply to
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub sizing: Option<SizingOverrides>,
    #[serde(default)]
    pub cycle: Option<CycleOverrides>,
    #[serde(default)]
    pub selection: Option<SelectionOverrides>,
    #[serde(default)]
    pub strategy: Option<StrategyOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SizingOverrides {
    #[serde(default)]
    pub buffer_usd: Option<Decimal>,
    #[serde(default)]
    pub safety_multiplier: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleOverrides {
    #[serde(default)]
    pub max_iterations: Option<u64>,
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
    #[serde(default)]
    pub rpc_timeout_ms: Option<u64>,
    #[serde(default)]
    pub retry_backoff_ms: Option<u64>,
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionOverrides {
    #[serde(default)]
    pub policy: Option<SelectionPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyOverrides {
    #[serde(default)]
    pub deposit_asset: Option<String>,
    #[serde(default)]
    pub borrow_asset: Option<String>,
    #[serde(default)]
    pub min_deposit_raw: Option<u64>,
}

impl DeploymentConfig {
    /// Load deployment config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: DeploymentConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

impl BotConfigOverrides {
    /// Apply every present override onto `config`.
    pub fn apply(&self, config: &mut BotConfig) {
        if let Some(sizing) = &self.sizing {
            if let Some(v) = sizing.buffer_usd {
                config.sizing.buffer_usd = v;
            }
            if let Some(v) = sizing.safety_multiplier {
                config.sizing.safety_multiplier = v;
            }
        }

        if let Some(cycle) = &self.cycle {
            if cycle.max_iterations.is_some() {
                config.cycle.max_iterations = cycle.max_iterations;
            }
            if let Some(v) = cycle.min_interval_ms {
                config.cycle.min_interval_ms = v;
            }
            if let Some(v) = cycle.rpc_timeout_ms {
                config.cycle.rpc_timeout_ms = v;
            }
            if let Some(v) = cycle.retry_backoff_ms {
                config.cycle.retry_backoff_ms = v;
            }
            if let Some(v) = cycle.max_consecutive_failures {
                config.cycle.max_consecutive_failures = v;
            }
        }

        if let Some(policy) = self.selection.as_ref().and_then(|s| s.policy) {
            config.selection.policy = policy;
        }

        if let Some(strategy) = &self.strategy {
            if let Some(v) = &strategy.deposit_asset {
                config.strategy.deposit_asset = v.clone();
            }
            if let Some(v) = &strategy.borrow_asset {
                config.strategy.borrow_asset = v.clone();
            }
            if let Some(v) = strategy.min_deposit_raw {
                config.strategy.min_deposit_raw = v;
            }
        }
    }
}
