//! Asset configuration loading from TOML files.

use leverage_chain::{OracleSource, PriceFeed};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Asset configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// List of assets
    pub assets: Vec<AssetConfig>,
}

/// Individual asset configuration (TOML-loadable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Market coin name (e.g., "usdc", "sui"), as the lending market names it
    pub symbol: String,
    /// Full Move coin type
    pub coin_type: String,
    /// Oracle source kind
    #[serde(default = "default_oracle_source")]
    pub oracle_source: String,
    /// Price feed object id (may reference an env var as `${NAME}`)
    pub feed_id: String,
    /// Whether this asset is active
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_oracle_source() -> String {
    "pyth".to_string()
}

fn default_true() -> bool {
    true
}

impl AssetConfig {
    /// Parse oracle source.
    pub fn oracle_source(&self) -> anyhow::Result<OracleSource> {
        OracleSource::parse(&self.oracle_source)
            .ok_or_else(|| anyhow::anyhow!("Unknown oracle source: {}", self.oracle_source))
    }

    /// Price feed with the given (already expanded) feed id.
    pub fn price_feed(&self, feed_id: String) -> anyhow::Result<PriceFeed> {
        Ok(PriceFeed {
            source: self.oracle_source()?,
            feed_id,
        })
    }
}

impl AssetsConfig {
    /// Load assets config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: AssetsConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get active assets only.
    pub fn active_assets(&self) -> impl Iterator<Item = &AssetConfig> {
        self.assets.iter().filter(|a| a.active)
    }
}
