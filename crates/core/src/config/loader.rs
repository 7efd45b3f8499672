//! Unified deployment loader that ties together all configuration.
//!
//! This module provides a single entry point for loading everything the
//! loop needs: endpoints, owner address, asset registry entries and the
//! bot configuration with deployment overrides applied.

use super::{AssetsConfig, BotConfig, BotConfigOverrides, DeploymentConfig};
use anyhow::{bail, Context, Result};
use leverage_chain::{CoinType, PriceFeed, SuiAddress};
use regex_lite::{Captures, Regex};
use std::path::{Path, PathBuf};
use tracing::info;

/// Fully resolved deployment configuration.
#[derive(Debug, Clone)]
pub struct ResolvedDeployment {
    /// Deployment name
    pub name: String,
    /// Network label
    pub network: String,
    /// Lending market identifier
    pub market: String,
    /// Sui JSON-RPC URL
    pub rpc_url: String,
    /// Gateway base URL
    pub gateway_url: String,
    /// Obligation owner
    pub owner: SuiAddress,
    /// Asset configurations
    pub assets: Vec<ResolvedAsset>,
    /// Bot configuration (with deployment overrides applied)
    pub bot: BotConfig,
}

/// Resolved asset configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// Market coin name
    pub symbol: String,
    /// Normalized coin type
    pub coin_type: CoinType,
    /// Price feed
    pub feed: PriceFeed,
    /// Whether asset is active
    pub active: bool,
}

/// Deployment loader for unified configuration.
pub struct DeploymentLoader {
    /// Config directory path
    config_dir: PathBuf,
}

impl DeploymentLoader {
    /// Create a new deployment loader over a config directory.
    pub fn new(config_dir: impl AsRef<Path>) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();
        anyhow::ensure!(
            config_dir.is_dir(),
            "Config directory {:?} does not exist",
            config_dir
        );
        Ok(Self { config_dir })
    }

    /// Load a deployment by name from `deployments/<name>.toml`.
    pub fn load(&self, deployment_name: &str) -> Result<ResolvedDeployment> {
        info!(deployment = deployment_name, "Loading deployment configuration");

        let deployment_path = self
            .config_dir
            .join("deployments")
            .join(format!("{deployment_name}.toml"));
        let deployment = DeploymentConfig::from_file(&deployment_path)
            .with_context(|| format!("Failed to load deployment from {:?}", deployment_path))?;

        let assets_path = self
            .config_dir
            .join("assets")
            .join(format!("{}.toml", deployment.deployment.assets));
        let assets_config = AssetsConfig::from_file(&assets_path)
            .with_context(|| format!("Failed to load assets from {:?}", assets_path))?;

        let details = &deployment.deployment;
        let rpc_url = expand_env(&details.rpc_url).context("rpc_url")?;
        let gateway_url = expand_env(&details.gateway_url).context("gateway_url")?;
        let owner_str = expand_env(&details.owner).context("owner")?;
        let owner: SuiAddress = owner_str
            .parse()
            .with_context(|| format!("Invalid owner address '{owner_str}'"))?;

        let assets = resolve_assets(&assets_config)?;
        let bot = build_bot_config(deployment.bot.as_ref());

        info!(
            deployment = deployment_name,
            network = %details.network,
            assets = assets.len(),
            "Deployment resolved"
        );

        Ok(ResolvedDeployment {
            name: details.name.clone(),
            network: details.network.clone(),
            market: details.market.clone(),
            rpc_url,
            gateway_url,
            owner,
            assets,
            bot,
        })
    }

    /// Load deployment from environment variable DEPLOYMENT.
    pub fn load_from_env(&self) -> Result<ResolvedDeployment> {
        let deployment_name =
            std::env::var("DEPLOYMENT").unwrap_or_else(|_| "scallop-mainnet".to_string());
        self.load(&deployment_name)
    }
}

fn resolve_assets(config: &AssetsConfig) -> Result<Vec<ResolvedAsset>> {
    config
        .assets
        .iter()
        .map(|asset| {
            let feed_id = expand_env(&asset.feed_id)
                .with_context(|| format!("feed_id of {}", asset.symbol))?;
            Ok(ResolvedAsset {
                symbol: asset.symbol.clone(),
                coin_type: CoinType::new(&asset.coin_type),
                feed: asset.price_feed(feed_id)?,
                active: asset.active,
            })
        })
        .collect()
}

fn build_bot_config(overrides: Option<&BotConfigOverrides>) -> BotConfig {
    let mut config = overrides
        .and_then(|o| o.profile.as_deref())
        .and_then(BotConfig::load_profile)
        .unwrap_or_else(BotConfig::from_env);

    if let Some(ovr) = overrides {
        ovr.apply(&mut config);
    }
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config
}

/// Expand every `${VAR}` reference from the environment.
///
/// A referenced variable that is unset is an error.
pub fn expand_env(raw: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;

    let mut missing: Option<String> = None;
    let expanded = re.replace_all(raw, |caps: &Captures<'_>| {
        let name = &caps[1];
        std::env::var(name).unwrap_or_else(|_| {
            missing.get_or_insert_with(|| name.to_string());
            String::new()
        })
    });

    if let Some(name) = missing {
        bail!("Missing env var: {name}");
    }
    if re.replace_all(raw, "").contains("${") {
        bail!("Unterminated variable reference in '{raw}'");
    }
    Ok(expanded.into_owned())
}

/// Load a deployment from the default config directory.
///
/// Uses CONFIG_DIR env var or defaults to "./config".
pub fn load_deployment(deployment_name: &str) -> Result<ResolvedDeployment> {
    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "./config".to_string());
    let loader = DeploymentLoader::new(&config_dir)?;
    loader.load(deployment_name)
}

/// Load deployment from DEPLOYMENT env var.
pub fn load_deployment_from_env() -> Result<ResolvedDeployment> {
    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "./config".to_string());
    let loader = DeploymentLoader::new(&config_dir)?;
    loader.load_from_env()
}
