//! Configuration management with profile support.
//!
//! Provides centralized configuration for all loop parameters with
//! support for different profiles (testing, conservative, aggressive).

use crate::selector::SelectionPolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure containing all loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Borrow sizing safety margins
    #[serde(default)]
    pub sizing: SizingConfig,

    /// Loop pacing, timeouts and failure budget
    #[serde(default)]
    pub cycle: CycleConfig,

    /// Obligation selection
    #[serde(default)]
    pub selection: SelectionConfig,

    /// What to deposit and what to borrow
    #[serde(default)]
    pub strategy: StrategyConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Safety margins applied when converting capacity into a borrow amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Fixed USD buffer subtracted from available capacity
    #[serde(default = "default_buffer_usd")]
    pub buffer_usd: Decimal,

    /// Multiplier applied after borrow-weight scaling
    #[serde(default = "default_safety_multiplier")]
    pub safety_multiplier: Decimal,
}

fn default_buffer_usd() -> Decimal {
    dec!(0.1)
}
fn default_safety_multiplier() -> Decimal {
    dec!(0.99)
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            buffer_usd: default_buffer_usd(),
            safety_multiplier: default_safety_multiplier(),
        }
    }
}

/// Loop pacing and failure handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Stop after this many attempted cycles, failed ones included (unbounded when absent)
    #[serde(default)]
    pub max_iterations: Option<u64>,

    /// Delay between cycles (milliseconds)
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,

    /// Deadline for each network call (milliseconds)
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_ms: u64,

    /// Base backoff after a retryable failure (milliseconds)
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Abort after this many retryable failures in a row
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,
}

fn default_min_interval() -> u64 {
    30_000
}
fn default_rpc_timeout() -> u64 {
    15_000
}
fn default_retry_backoff() -> u64 {
    5_000
}
fn default_max_failures() -> u32 {
    5
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            min_interval_ms: default_min_interval(),
            rpc_timeout_ms: default_rpc_timeout(),
            retry_backoff_ms: default_retry_backoff(),
            max_consecutive_failures: default_max_failures(),
        }
    }
}

impl CycleConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Obligation selection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub policy: SelectionPolicy,
}

/// Deposit and borrow assets (registry symbols).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Asset whose whole wallet balance is deposited as collateral
    #[serde(default = "default_asset")]
    pub deposit_asset: String,

    /// Asset borrowed against the obligation
    #[serde(default = "default_asset")]
    pub borrow_asset: String,

    /// Deposit only when the wallet balance exceeds this (raw units)
    #[serde(default)]
    pub min_deposit_raw: u64,
}

fn default_asset() -> String {
    "usdc".to_string()
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            deposit_asset: default_asset(),
            borrow_asset: default_asset(),
            min_deposit_raw: 0,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            sizing: SizingConfig::default(),
            cycle: CycleConfig::default(),
            selection: SelectionConfig::default(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Short, bounded run for dry runs against a test deployment.
    pub fn testing() -> Self {
        Self {
            profile: "testing".to_string(),
            sizing: SizingConfig {
                buffer_usd: dec!(1),
                safety_multiplier: dec!(0.5),
            },
            cycle: CycleConfig {
                max_iterations: Some(3),
                min_interval_ms: 5_000,
                rpc_timeout_ms: 10_000,
                retry_backoff_ms: 1_000,
                max_consecutive_failures: 2,
            },
            selection: SelectionConfig::default(),
            strategy: StrategyConfig::default(),
        }
    }

    /// Wider margins and slower pacing.
    pub fn conservative() -> Self {
        Self {
            profile: "conservative".to_string(),
            sizing: SizingConfig {
                buffer_usd: dec!(5),
                safety_multiplier: dec!(0.95),
            },
            cycle: CycleConfig {
                max_iterations: None,
                min_interval_ms: 120_000,
                rpc_timeout_ms: 20_000,
                retry_backoff_ms: 10_000,
                max_consecutive_failures: 3,
            },
            selection: SelectionConfig {
                policy: SelectionPolicy::LargestCollateralValue,
            },
            strategy: StrategyConfig {
                min_deposit_raw: 1_000_000,
                ..Default::default()
            },
        }
    }

    /// Thin margins and fast pacing.
    pub fn aggressive() -> Self {
        Self {
            profile: "aggressive".to_string(),
            sizing: SizingConfig {
                buffer_usd: dec!(0.05),
                safety_multiplier: dec!(0.995),
            },
            cycle: CycleConfig {
                max_iterations: None,
                min_interval_ms: 5_000,
                rpc_timeout_ms: 10_000,
                retry_backoff_ms: 2_000,
                max_consecutive_failures: 10,
            },
            selection: SelectionConfig::default(),
            strategy: StrategyConfig::default(),
        }
    }

    /// Look up a named profile.
    pub fn load_profile(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" => Some(Self::default()),
            "testing" | "test" => Some(Self::testing()),
            "conservative" | "safe" => Some(Self::conservative()),
            "aggressive" | "aggro" => Some(Self::aggressive()),
            _ => None,
        }
    }

    /// Get profile from environment variable BOT_PROFILE, or default.
    /// Supported values: testing, conservative, aggressive, or a TOML file path.
    pub fn from_env() -> Self {
        let profile = std::env::var("BOT_PROFILE").unwrap_or_else(|_| "default".to_string());
        if let Some(config) = Self::load_profile(&profile) {
            return config;
        }
        match Self::from_file(&profile) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(profile = %profile, error = %e, "Unknown profile, using default");
                Self::default()
            }
        }
    }

    /// Apply overrides read through `lookup` (the process environment in production).
    ///
    /// `SELECTION_POLICY` replaces the selection policy; an unknown value is
    /// ignored with a warning.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("SELECTION_POLICY") {
            match SelectionPolicy::parse(&raw) {
                Some(policy) => self.selection.policy = policy,
                None => tracing::warn!(value = %raw, "Unknown SELECTION_POLICY, keeping configured policy"),
            }
        }
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "Bot configuration loaded");
        tracing::info!(
            buffer_usd = %self.sizing.buffer_usd,
            safety_multiplier = %self.sizing.safety_multiplier,
            "Sizing margins"
        );
        tracing::info!(
            max_iterations = ?self.cycle.max_iterations,
            min_interval_ms = self.cycle.min_interval_ms,
            rpc_timeout_ms = self.cycle.rpc_timeout_ms,
            retry_backoff_ms = self.cycle.retry_backoff_ms,
            max_failures = self.cycle.max_consecutive_failures,
            "Cycle pacing"
        );
        tracing::info!(
            policy = %self.selection.policy,
            deposit = %self.strategy.deposit_asset,
            borrow = %self.strategy.borrow_asset,
            min_deposit_raw = self.strategy.min_deposit_raw,
            "Strategy"
        );
    }
}

/// Global configuration holder using lazy initialization.
use std::sync::OnceLock;

static GLOBAL_CONFIG: OnceLock<BotConfig> = OnceLock::new();

/// Initialize global configuration.
pub fn init_config(config: BotConfig) {
    let _ = GLOBAL_CONFIG.set(config);
}

/// Get the global configuration, initializing from environment if needed.
pub fn config() -> &'static BotConfig {
    GLOBAL_CONFIG.get_or_init(BotConfig::from_env)
}
