//! Ledger configuration.
//!
//! `LedgerConfig::load()` reads `config/stock_ledger.toml` (optional) and
//! `STOCK_LEDGER_*` environment variables, e.g. `STOCK_LEDGER_BULK_PARALLELISM=8`.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config/stock_ledger";
const ENV_PREFIX: &str = "STOCK_LEDGER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Threshold given to newly registered records.
    pub default_low_stock_threshold: i64,
    /// Trailing sales window used for velocity, and the fixed denominator.
    pub forecast_window_days: u32,
    /// Days of stock a suggested reorder should cover.
    pub reorder_cover_days: u32,
    /// Reorder once stock is down to this share of today's stock.
    pub reorder_trigger_percent: u32,
    /// Reported instead of a day count when nothing sells.
    pub stockout_sentinel_days: i64,
    /// Automatic retries after a lost conditional update.
    pub max_conflict_retries: u32,
    pub adjust_timeout_ms: u64,
    /// Worker threads used by one bulk adjustment.
    pub bulk_parallelism: usize,
    pub bind_addr: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_low_stock_threshold: 5,
            forecast_window_days: 30,
            reorder_cover_days: 30,
            reorder_trigger_percent: 20,
            stockout_sentinel_days: 999,
            max_conflict_retries: 1,
            adjust_timeout_ms: 5_000,
            bulk_parallelism: 4,
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load from the optional config file, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: LedgerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_low_stock_threshold < 0 {
            return Err(ConfigError::Message(
                "default_low_stock_threshold must be >= 0".into(),
            ));
        }
        if self.forecast_window_days == 0 {
            return Err(ConfigError::Message(
                "forecast_window_days must be > 0".into(),
            ));
        }
        if self.reorder_trigger_percent > 100 {
            return Err(ConfigError::Message(
                "reorder_trigger_percent must be <= 100".into(),
            ));
        }
        if self.bulk_parallelism == 0 {
            return Err(ConfigError::Message("bulk_parallelism must be > 0".into()));
        }
        if self.adjust_timeout_ms == 0 {
            return Err(ConfigError::Message("adjust_timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn adjust_timeout(&self) -> Duration {
        Duration::from_millis(self.adjust_timeout_ms)
    }
}
