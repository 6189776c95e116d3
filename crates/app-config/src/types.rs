// In crates/app-config/src/types.rs

use crate::{Error, Result};
use execution::types::{PaperSettings, RetryPolicy};
use risk::types::RiskSettings;
use serde::{Deserialize, Serialize};
use strategies::types::SignalSettings;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Settings {
    /// The application's general settings.
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub trading: TradingConfig,
    /// The simulated venue used by `run`.
    #[serde(default)]
    pub paper: PaperSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.trading.validate()?;
        self.paper.validate()?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    #[serde(default = "default_environment")]
    pub environment: String,
    /// The log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
        }
    }
}

/// Everything the engine needs to trade. This is the unit `setConfig` replaces.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TradingConfig {
    #[serde(default)]
    pub strategy: SignalSettings,
    #[serde(default)]
    pub risk: RiskSettings,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Number of finalized candles kept in the rolling window.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            strategy: SignalSettings::default(),
            risk: RiskSettings::default(),
            retry: RetryPolicy::default(),
            history_size: default_history_size(),
        }
    }
}

impl TradingConfig {
    /// Checks every field and reports the first violation.
    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;
        self.risk.validate()?;
        self.retry.validate()?;
        let lookback = self.strategy.lookback();
        if self.history_size > MAX_HISTORY_SIZE {
            return Err(Error::InvalidParameters {
                field: "history_size".to_string(),
                reason: format!("must not exceed {MAX_HISTORY_SIZE} candles"),
            });
        }
        if self.history_size < lookback {
            return Err(Error::InvalidParameters {
                field: "history_size".to_string(),
                reason: format!("must hold at least {lookback} candles for the configured indicators"),
            });
        }
        Ok(())
    }
}

pub const MAX_HISTORY_SIZE: usize = 100_000;

fn default_environment() -> String { "development".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_history_size() -> usize { 200 }
