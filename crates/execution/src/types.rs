// In crates/execution/src/types.rs

use crate::{Error, Result};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the simulated venue used in dry runs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaperSettings {
    /// Starting balance of the paper account.
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,

    /// Adverse slippage applied to every fill, in percent (0.05 means 0.05%).
    #[serde(default)]
    pub slippage_percent: f64,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            slippage_percent: 0.0,
        }
    }
}

impl PaperSettings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=MAX_INITIAL_CAPITAL).contains(&self.initial_capital) {
            return Err(invalid("initial_capital", "must be within [0, 1e15]"));
        }
        if !(0.0..100.0).contains(&self.slippage_percent) {
            return Err(invalid("slippage_percent", "must be within [0, 100)"));
        }
        if self.initial_capital > 0.0 && self.initial_capital_amount() <= Decimal::ZERO {
            return Err(invalid("initial_capital", "is too small to represent"));
        }
        Ok(())
    }

    pub fn initial_capital_amount(&self) -> Decimal {
        Decimal::from_f64(self.initial_capital).unwrap_or_default()
    }

    pub fn slippage_fraction(&self) -> Decimal {
        Decimal::from_f64(self.slippage_percent).unwrap_or_default() / Decimal::ONE_HUNDRED
    }
}

/// Bounded exponential backoff applied around every exchange call.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts", "must be at least 1"));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(invalid("max_backoff_ms", "must not be below initial_backoff_ms"));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(invalid("multiplier", "must be at least 1.0"));
        }
        Ok(())
    }

    /// Delay before retry number `retry` (1-based), capped at `max_backoff_ms`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_backoff_ms as f64 * self.multiplier.powi(exp);
        Duration::from_millis(millis.min(self.max_backoff_ms as f64) as u64)
    }
}

const MAX_INITIAL_CAPITAL: f64 = 1e15;

fn invalid(field: &str, reason: &str) -> Error {
    Error::InvalidParameters {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn default_initial_capital() -> f64 { 10_000.0 }
fn default_max_attempts() -> u32 { 3 }
fn default_initial_backoff_ms() -> u64 { 500 }
fn default_max_backoff_ms() -> u64 { 5_000 }
fn default_multiplier() -> f64 { 2.0 }
