//! Configuration types for algotrader

use crate::telemetry::LogFormat;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bus: BusConfig,
    pub feed: FeedConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Message bus endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Relay endpoint to connect to (e.g. "ws://localhost:9000")
    pub url: String,
}

/// Price feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub exchange: String,
    pub symbol: String,

    /// Seconds between polls of the price source
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Timeout for a single price request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    5
}
fn default_request_timeout_secs() -> u64 {
    10
}

/// Strategy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Number of prices in the moving average window
    pub sma_window: usize,
}

/// Health endpoint configuration, one port per stage
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_ingest_port")]
    pub ingest_port: u16,

    #[serde(default = "default_strategy_port")]
    pub strategy_port: u16,
}

fn default_ingest_port() -> u16 {
    8080
}
fn default_strategy_port() -> u16 {
    8081
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            ingest_port: default_ingest_port(),
            strategy_port: default_strategy_port(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline must not start with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bus.url.is_empty() {
            anyhow::bail!("bus.url must be set");
        }
        if self.feed.symbol.is_empty() {
            anyhow::bail!("feed.symbol must be set");
        }
        if self.feed.poll_interval_secs == 0 {
            anyhow::bail!("feed.poll_interval_secs must be > 0");
        }
        if self.feed.request_timeout_secs == 0 {
            anyhow::bail!("feed.request_timeout_secs must be > 0");
        }
        if self.strategy.sma_window == 0 {
            anyhow::bail!("strategy.sma_window must be > 0");
        }
        Ok(())
    }
}
