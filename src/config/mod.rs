//! Configuration management for Arbscope
//!
//! Loads from YAML files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub collector: CollectorConfig,
    pub arbitrage: ArbitrageConfig,
    pub analytics: AnalyticsConfig,
    pub persistence: PersistenceConfig,
    /// Asset table; ships in config/default.yaml
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    /// Network table; ships in config/default.yaml
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Enable the centralized-exchange feed
    pub cex_enabled: bool,
    /// Centralized-exchange REST base URL
    pub cex_url: String,
    /// Per-request timeout in milliseconds (applies to CEX and RPC calls)
    pub request_timeout_ms: u64,
    /// Retry attempts for the CEX bulk fetch
    pub max_retries: usize,
    /// Base backoff between retries in milliseconds (doubles per attempt)
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArbitrageConfig {
    /// Minimum spread percentage an opportunity must clear
    pub min_spread_pct: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Rolling window size (observation count) for return volatility
    pub window_size: usize,
    /// Days of history to load for offline analysis
    pub history_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Data directory
    pub data_dir: String,
    /// Enable CSV record store
    pub csv_enabled: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Collector defaults
            .set_default("collector.cex_enabled", true)?
            .set_default("collector.cex_url", "https://api.binance.com")?
            .set_default("collector.request_timeout_ms", 10_000)?
            .set_default("collector.max_retries", 3)?
            .set_default("collector.retry_backoff_ms", 1_000)?
            // Arbitrage defaults
            .set_default("arbitrage.min_spread_pct", 0.1)?
            // Analytics defaults
            .set_default("analytics.window_size", 20)?
            .set_default("analytics.history_days", 7)?
            // Persistence defaults
            .set_default("persistence.data_dir", "./data")?
            .set_default("persistence.csv_enabled", true)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (ARBSCOPE_*)
            .add_source(Environment::with_prefix("ARBSCOPE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject inconsistent configuration before the first cycle runs
    pub fn validate(&self) -> Result<()> {
        if self.tokens.is_empty() {
            bail!("no tokens configured; add a tokens table to config/default.yaml");
        }
        if self.chains.is_empty() {
            bail!("no chains configured; add a chains table to config/default.yaml");
        }

        let mut symbols = HashSet::new();
        for token in &self.tokens {
            token.validate()?;
            if !symbols.insert(token.symbol.as_str()) {
                bail!("duplicate token symbol: {}", token.symbol);
            }
        }

        let mut names = HashSet::new();
        for chain in &self.chains {
            chain.validate()?;
            if !names.insert(chain.name.as_str()) {
                bail!("duplicate chain name: {}", chain.name);
            }
        }

        for token in &self.tokens {
            for chain in token.addresses.keys() {
                if !names.contains(chain.as_str()) {
                    bail!(
                        "token {} references unknown chain {}",
                        token.symbol,
                        chain
                    );
                }
            }
        }

        if self.arbitrage.min_spread_pct < Decimal::ZERO {
            bail!("arbitrage.min_spread_pct must not be negative");
        }
        if self.analytics.window_size == 0 {
            bail!("analytics.window_size must be positive");
        }
        if self.collector.request_timeout_ms == 0 {
            bail!("collector.request_timeout_ms must be positive");
        }
        Ok(())
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "tokens={} chains={} min_spread={}% window={} data_dir={}",
            self.tokens.len(),
            self.chains.len(),
            self.arbitrage.min_spread_pct,
            self.analytics.window_size,
            self.persistence.data_dir
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
