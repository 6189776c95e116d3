// In crates/strategies/src/types.rs

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters of the RSI + Bollinger Band reversion entry rules.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SignalSettings {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// RSI band in which a LONG entry is allowed (inclusive).
    #[serde(default = "default_rsi_long_lower")]
    pub rsi_long_lower: f64,
    #[serde(default = "default_rsi_long_upper")]
    pub rsi_long_upper: f64,
    /// RSI band in which a SHORT entry is allowed (inclusive).
    #[serde(default = "default_rsi_short_lower")]
    pub rsi_short_lower: f64,
    #[serde(default = "default_rsi_short_upper")]
    pub rsi_short_upper: f64,

    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,
    /// Band distance from the mid line in standard deviations.
    #[serde(default = "default_bollinger_std_dev")]
    pub bollinger_std_dev: f64,
    /// Volatility filter on the normalized band width (inclusive).
    #[serde(default = "default_bb_width_min")]
    pub bb_width_min: f64,
    #[serde(default = "default_bb_width_max")]
    pub bb_width_max: f64,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            rsi_long_lower: default_rsi_long_lower(),
            rsi_long_upper: default_rsi_long_upper(),
            rsi_short_lower: default_rsi_short_lower(),
            rsi_short_upper: default_rsi_short_upper(),
            bollinger_period: default_bollinger_period(),
            bollinger_std_dev: default_bollinger_std_dev(),
            bb_width_min: default_bb_width_min(),
            bb_width_max: default_bb_width_max(),
        }
    }
}

impl SignalSettings {
    /// Number of candles needed before a snapshot can be computed.
    ///
    /// Wilder's RSI needs `rsi_period` deltas, hence one extra close.
    pub fn lookback(&self) -> usize {
        self.rsi_period.saturating_add(1).max(self.bollinger_period)
    }

    /// Checks every field against its bounds. The first violation wins.
    pub fn validate(&self) -> Result<()> {
        if !(2..=MAX_PERIOD).contains(&self.rsi_period) {
            return Err(invalid("rsi_period", "must be within 2..=1000"));
        }
        if !(2..=MAX_PERIOD).contains(&self.bollinger_period) {
            return Err(invalid("bollinger_period", "must be within 2..=1000"));
        }
        check_rsi_range("rsi_long", self.rsi_long_lower, self.rsi_long_upper)?;
        check_rsi_range("rsi_short", self.rsi_short_lower, self.rsi_short_upper)?;
        if !self.bollinger_std_dev.is_finite() || self.bollinger_std_dev <= 0.0 {
            return Err(invalid("bollinger_std_dev", "must be a positive number"));
        }
        if !self.bb_width_min.is_finite() || self.bb_width_min < 0.0 {
            return Err(invalid("bb_width_min", "must be zero or positive"));
        }
        if !self.bb_width_max.is_finite() || self.bb_width_max < self.bb_width_min {
            return Err(invalid("bb_width_max", "must be >= bb_width_min"));
        }
        Ok(())
    }
}

pub const MAX_PERIOD: usize = 1_000;

fn check_rsi_range(prefix: &str, lower: f64, upper: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&lower) {
        return Err(invalid(&format!("{prefix}_lower"), "must be within 0..=100"));
    }
    if !(0.0..=100.0).contains(&upper) {
        return Err(invalid(&format!("{prefix}_upper"), "must be within 0..=100"));
    }
    if lower > upper {
        return Err(invalid(&format!("{prefix}_upper"), "must be >= the lower bound"));
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::InvalidParameters {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn default_rsi_period() -> usize { 14 }
fn default_rsi_long_lower() -> f64 { 30.0 }
fn default_rsi_long_upper() -> f64 { 35.0 }
fn default_rsi_short_lower() -> f64 { 65.0 }
fn default_rsi_short_upper() -> f64 { 70.0 }
fn default_bollinger_period() -> usize { 20 }
fn default_bollinger_std_dev() -> f64 { 2.0 }
fn default_bb_width_min() -> f64 { 0.01 }
fn default_bb_width_max() -> f64 { 0.08 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = SignalSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.lookback(), 20);
    }

    #[test]
    fn lookback_covers_rsi_deltas() {
        let settings = SignalSettings { rsi_period: 30, ..Default::default() };
        assert_eq!(settings.lookback(), 31);
    }

    #[test]
    fn lookback_saturates_on_huge_periods() {
        let settings = SignalSettings { rsi_period: usize::MAX, ..Default::default() };
        assert_eq!(settings.lookback(), usize::MAX);
    }

    #[test]
    fn inverted_rsi_band_is_rejected() {
        let settings = SignalSettings {
            rsi_long_lower: 40.0,
            rsi_long_upper: 35.0,
            ..Default::default()
        };
        match settings.validate() {
            Err(Error::InvalidParameters { field, .. }) => assert_eq!(field, "rsi_long_upper"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let cases = [
            SignalSettings { rsi_period: 1, ..Default::default() },
            SignalSettings { bollinger_period: 0, ..Default::default() },
            SignalSettings { bollinger_period: 1_001, ..Default::default() },
            SignalSettings { rsi_period: usize::MAX, ..Default::default() },
            SignalSettings { rsi_short_upper: 101.0, ..Default::default() },
            SignalSettings { bollinger_std_dev: 0.0, ..Default::default() },
            SignalSettings { bb_width_min: -0.1, ..Default::default() },
            SignalSettings { bb_width_max: 0.001, ..Default::default() },
            SignalSettings { bb_width_max: f64::NAN, ..Default::default() },
        ];
        for settings in cases {
            assert!(settings.validate().is_err(), "accepted {settings:?}");
        }
    }
}
