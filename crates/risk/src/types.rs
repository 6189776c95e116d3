// In crates/risk/src/types.rs

use crate::{Error, Result};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Capital allocation and exit parameters.
///
/// Percentages are expressed in percent (`1.25` means 1.25%), not fractions.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RiskSettings {
    /// Hard operating cap. Capital above it is kept aside as surplus.
    #[serde(default = "default_cap")]
    pub cap: f64,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Share of the operating capital committed as notional per position.
    #[serde(default = "default_capital_percentage")]
    pub capital_percentage: f64,
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: f64,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
    #[serde(default = "default_trailing_enabled")]
    pub trailing_enabled: bool,
    /// Favourable price excursion that arms the trailing stop.
    #[serde(default = "default_trailing_pct")]
    pub trailing_activation_pct: f64,
    /// Distance of the trailing stop behind the best price seen.
    #[serde(default = "default_trailing_pct")]
    pub trailing_distance_pct: f64,
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            cap: default_cap(),
            leverage: default_leverage(),
            capital_percentage: default_capital_percentage(),
            take_profit_pct: default_take_profit_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            trailing_enabled: default_trailing_enabled(),
            trailing_activation_pct: default_trailing_pct(),
            trailing_distance_pct: default_trailing_pct(),
            max_positions: default_max_positions(),
        }
    }
}

impl RiskSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.cap > 0.0 && self.cap <= MAX_CAP) {
            return Err(invalid("cap", "must be within (0, 1e15]"));
        }
        if !(1..=MAX_LEVERAGE).contains(&self.leverage) {
            return Err(invalid("leverage", "must be within 1..=125"));
        }
        if !(1.0..=100.0).contains(&self.capital_percentage) {
            return Err(invalid("capital_percentage", "must be within 1..=100"));
        }
        if !(self.take_profit_pct > 0.0 && self.take_profit_pct <= MAX_TARGET_PCT) {
            return Err(invalid("take_profit_pct", "must be within (0, 1000]"));
        }
        if !(self.stop_loss_pct > 0.0 && self.stop_loss_pct < 100.0) {
            return Err(invalid("stop_loss_pct", "must be within (0, 100)"));
        }
        if !(self.trailing_activation_pct > 0.0 && self.trailing_activation_pct <= MAX_TARGET_PCT) {
            return Err(invalid("trailing_activation_pct", "must be within (0, 1000]"));
        }
        if !(self.trailing_distance_pct > 0.0 && self.trailing_distance_pct < 100.0) {
            return Err(invalid("trailing_distance_pct", "must be within (0, 100)"));
        }
        if self.max_positions == 0 {
            return Err(invalid("max_positions", "must be at least 1"));
        }

        // Values below Decimal's resolution would collapse to zero.
        let derived = [
            ("cap", self.cap_amount()),
            ("take_profit_pct", self.take_profit_fraction()),
            ("stop_loss_pct", self.stop_loss_fraction()),
            ("trailing_activation_pct", self.trailing_activation_fraction()),
            ("trailing_distance_pct", self.trailing_distance_fraction()),
        ];
        if let Some((field, _)) = derived.iter().find(|(_, value)| *value <= Decimal::ZERO) {
            return Err(invalid(field, "is too small to represent"));
        }
        Ok(())
    }

    pub fn cap_amount(&self) -> Decimal {
        to_decimal(self.cap)
    }

    /// `capital_percentage` as a fraction.
    pub fn capital_fraction(&self) -> Decimal {
        percent(self.capital_percentage)
    }

    pub fn take_profit_fraction(&self) -> Decimal {
        percent(self.take_profit_pct)
    }

    pub fn stop_loss_fraction(&self) -> Decimal {
        percent(self.stop_loss_pct)
    }

    pub fn trailing_activation_fraction(&self) -> Decimal {
        percent(self.trailing_activation_pct)
    }

    pub fn trailing_distance_fraction(&self) -> Decimal {
        percent(self.trailing_distance_pct)
    }
}

const MAX_LEVERAGE: u32 = 125;
const MAX_CAP: f64 = 1e15;
const MAX_TARGET_PCT: f64 = 1_000.0;

// Unrepresentable values map to zero, which `validate` rejects.
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

fn percent(value: f64) -> Decimal {
    to_decimal(value) / Decimal::ONE_HUNDRED
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::InvalidParameters {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn default_cap() -> f64 { 10_000.0 }
fn default_leverage() -> u32 { 5 }
fn default_capital_percentage() -> f64 { 100.0 }
fn default_take_profit_pct() -> f64 { 5.5 }
fn default_stop_loss_pct() -> f64 { 1.25 }
fn default_trailing_enabled() -> bool { true }
fn default_trailing_pct() -> f64 { 1.5 }
fn default_max_positions() -> usize { 1 }

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_documented_values() {
        let s = RiskSettings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.cap_amount(), dec!(10000));
        assert_eq!(s.stop_loss_fraction(), dec!(0.0125));
        assert_eq!(s.take_profit_fraction(), dec!(0.055));
        assert_eq!(s.capital_fraction(), dec!(1));
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let cases = [
            ("cap", RiskSettings { cap: 0.0, ..Default::default() }),
            ("leverage", RiskSettings { leverage: 0, ..Default::default() }),
            ("leverage", RiskSettings { leverage: 200, ..Default::default() }),
            ("capital_percentage", RiskSettings { capital_percentage: 0.5, ..Default::default() }),
            ("capital_percentage", RiskSettings { capital_percentage: 101.0, ..Default::default() }),
            ("take_profit_pct", RiskSettings { take_profit_pct: -1.0, ..Default::default() }),
            ("stop_loss_pct", RiskSettings { stop_loss_pct: 100.0, ..Default::default() }),
            ("trailing_distance_pct", RiskSettings { trailing_distance_pct: 0.0, ..Default::default() }),
            ("max_positions", RiskSettings { max_positions: 0, ..Default::default() }),
            ("cap", RiskSettings { cap: 1e29, ..Default::default() }),
            ("cap", RiskSettings { cap: f64::INFINITY, ..Default::default() }),
            ("take_profit_pct", RiskSettings { take_profit_pct: 1e29, ..Default::default() }),
            ("trailing_activation_pct", RiskSettings { trailing_activation_pct: 5_000.0, ..Default::default() }),
        ];
        for (expected, settings) in cases {
            match settings.validate() {
                Err(Error::InvalidParameters { field, .. }) => assert_eq!(field, expected),
                other => panic!("{expected}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn vanishing_percentages_are_rejected() {
        let cases = [
            ("stop_loss_pct", RiskSettings { stop_loss_pct: 1e-30, ..Default::default() }),
            ("take_profit_pct", RiskSettings { take_profit_pct: 1e-30, ..Default::default() }),
            ("trailing_distance_pct", RiskSettings { trailing_distance_pct: 1e-40, ..Default::default() }),
            ("cap", RiskSettings { cap: 1e-30, ..Default::default() }),
        ];
        for (expected, settings) in cases {
            match settings.validate() {
                Err(Error::InvalidParameters { field, .. }) => assert_eq!(field, expected),
                other => panic!("{expected}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn every_validated_setting_yields_positive_levels() {
        let settings = RiskSettings {
            cap: 1e15,
            take_profit_pct: 1_000.0,
            stop_loss_pct: 0.01,
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
        assert!(settings.cap_amount() > Decimal::ZERO);
        assert_eq!(settings.take_profit_fraction(), dec!(10));
        assert_eq!(settings.stop_loss_fraction(), dec!(0.0001));
    }
}
