// In crates/strategies/src/indicators.rs

//! Indicator computation over the rolling candle window.
//!
//! RSI uses Wilder's smoothing:
//! - first average gain/loss: simple mean of the first `period` deltas
//! - subsequent: `avg = (prev_avg * (period - 1) + current) / period`
//!
//! Bollinger Bands come from the `ta` crate, fed with the last
//! `bollinger_period` closes of the window.

use crate::types::SignalSettings;
use crate::{Error, Result};
use core_types::{Candle, IndicatorSnapshot};
use rust_decimal::prelude::*;
use ta::Next;
use ta::indicators::BollingerBands;

/// Upper, middle and lower band for a single window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub mid: f64,
    pub upper: f64,
    pub lower: f64,
}

impl Bands {
    /// `(upper - lower) / mid`. Zero when the mid line is zero.
    pub fn width(&self) -> f64 {
        if self.mid == 0.0 {
            0.0
        } else {
            (self.upper - self.lower) / self.mid
        }
    }
}

/// Pure transform from a candle window to the latest indicator snapshot.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    rsi_period: usize,
    bollinger_period: usize,
    bollinger_std_dev: f64,
}

impl IndicatorEngine {
    pub fn new(settings: &SignalSettings) -> Self {
        Self {
            rsi_period: settings.rsi_period,
            bollinger_period: settings.bollinger_period,
            bollinger_std_dev: settings.bollinger_std_dev,
        }
    }

    /// Minimum window length for a valid snapshot.
    pub fn lookback(&self) -> usize {
        (self.rsi_period + 1).max(self.bollinger_period)
    }

    /// Computes the snapshot for the most recent candle of `window`.
    ///
    /// The window must be ordered oldest first. Returns
    /// [`Error::InsufficientData`] while it is shorter than [`Self::lookback`].
    pub fn compute(&self, window: &[Candle]) -> Result<IndicatorSnapshot> {
        let required = self.lookback();
        if window.len() < required {
            return Err(Error::InsufficientData {
                required,
                available: window.len(),
            });
        }

        let closes: Vec<f64> = window.iter().map(|c| c.close.to_f64().unwrap_or(0.0)).collect();

        let rsi = wilder_rsi(&closes, self.rsi_period).ok_or(Error::InsufficientData {
            required,
            available: window.len(),
        })?;
        let bands = bollinger_bands(&closes, self.bollinger_period, self.bollinger_std_dev)?;

        // The window is non-empty here; `required` is at least 3.
        let as_of = window[window.len() - 1].open_time;

        Ok(IndicatorSnapshot {
            rsi,
            sma_mid: bands.mid,
            band_upper: bands.upper,
            band_lower: bands.lower,
            bb_width: bands.width(),
            as_of,
        })
    }
}

/// Wilder RSI of the last close in `closes`.
///
/// Returns `None` if fewer than `period` deltas are available. A window with
/// neither gains nor losses reports 50.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |d: f64| if d > 0.0 { d } else { 0.0 };
    let loss = |d: f64| if d < 0.0 { -d } else { 0.0 };

    let mut avg_gain = deltas[..period].iter().copied().map(gain).sum::<f64>() / period as f64;
    let mut avg_loss = deltas[..period].iter().copied().map(loss).sum::<f64>() / period as f64;

    let p = period as f64;
    for &d in &deltas[period..] {
        avg_gain = (avg_gain * (p - 1.0) + gain(d)) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss(d)) / p;
    }

    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };
    Some(rsi.clamp(0.0, 100.0))
}

/// Bollinger Bands over the last `period` closes.
pub fn bollinger_bands(closes: &[f64], period: usize, std_dev: f64) -> Result<Bands> {
    if closes.len() < period {
        return Err(Error::InsufficientData {
            required: period,
            available: closes.len(),
        });
    }

    let mut bb = BollingerBands::new(period, std_dev).map_err(|e| Error::InvalidParameters {
        field: "bollinger".to_string(),
        reason: format!("{e:?}"),
    })?;

    let mut last = None;
    for &close in &closes[closes.len() - period..] {
        last = Some(bb.next(close));
    }

    let out = last.ok_or(Error::InsufficientData {
        required: period,
        available: 0,
    })?;
    Ok(Bands {
        mid: out.average,
        upper: out.upper.max(out.average),
        lower: out.lower.min(out.average),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn candle(t: i64, close: f64) -> Candle {
        let c = Decimal::from_f64(close).unwrap();
        Candle {
            open_time: t,
            open: c,
            high: c,
            low: c,
            close: c,
            volume: dec!(1),
            is_closed: true,
        }
    }

    fn window(closes: &[f64]) -> Vec<Candle> {
        closes.iter().enumerate().map(|(i, &c)| candle(i as i64 * 300_000, c)).collect()
    }

    #[test]
    fn short_window_is_insufficient() {
        let engine = IndicatorEngine::new(&SignalSettings::default());
        let closes: Vec<f64> = (0..19).map(|i| 100.0 + i as f64).collect();
        assert_eq!(
            engine.compute(&window(&closes)),
            Err(Error::InsufficientData { required: 20, available: 19 })
        );
    }

    #[test]
    fn rsi_seed_is_simple_mean() {
        // Deltas: +1, -1, +2 -> avg gain 1, avg loss 1/3 -> RS 3 -> RSI 75.
        let rsi = wilder_rsi(&[10.0, 11.0, 10.0, 12.0], 3).unwrap();
        assert_relative_eq!(rsi, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn rsi_applies_wilder_smoothing_after_seed() {
        // Seed as above, then delta -3:
        // avg gain = (1*2 + 0)/3 = 2/3, avg loss = (1/3*2 + 3)/3 = 11/9.
        let rsi = wilder_rsi(&[10.0, 11.0, 10.0, 12.0, 9.0], 3).unwrap();
        let rs = (2.0 / 3.0) / (11.0 / 9.0);
        assert_relative_eq!(rsi, 100.0 - 100.0 / (1.0 + rs), epsilon = 1e-9);
    }

    #[test]
    fn rsi_extremes() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        assert_eq!(wilder_rsi(&rising, 14), Some(100.0));
        assert_eq!(wilder_rsi(&falling, 14), Some(0.0));
        assert_eq!(wilder_rsi(&[5.0; 20], 14), Some(50.0));
        assert_eq!(wilder_rsi(&[1.0, 2.0], 14), None);
    }

    #[test]
    fn bands_match_population_std_dev() {
        let closes = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // mean 5, population sigma 2
        let bands = bollinger_bands(&closes, 8, 2.0).unwrap();
        assert_relative_eq!(bands.mid, 5.0, epsilon = 1e-9);
        assert_relative_eq!(bands.upper, 9.0, epsilon = 1e-9);
        assert_relative_eq!(bands.lower, 1.0, epsilon = 1e-9);
        assert_relative_eq!(bands.width(), 8.0 / 5.0, epsilon = 1e-9);
    }

    #[test]
    fn bands_use_only_the_trailing_period() {
        let mut closes = vec![1000.0; 10];
        closes.extend([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let bands = bollinger_bands(&closes, 8, 2.0).unwrap();
        assert_relative_eq!(bands.mid, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn snapshot_is_stamped_with_last_candle() {
        let engine = IndicatorEngine::new(&SignalSettings::default());
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 4) as f64).collect();
        let w = window(&closes);
        let snap = engine.compute(&w).unwrap();
        assert_eq!(snap.as_of, w.last().unwrap().open_time);
    }

    proptest! {
        #[test]
        fn rsi_is_bounded(closes in prop::collection::vec(1.0..100_000.0_f64, 15..120)) {
            let rsi = wilder_rsi(&closes, 14).unwrap();
            prop_assert!((0.0..=100.0).contains(&rsi));
        }

        #[test]
        fn bands_are_ordered(closes in prop::collection::vec(1.0..100_000.0_f64, 20..120)) {
            let engine = IndicatorEngine::new(&SignalSettings::default());
            let snap = engine.compute(&window(&closes)).unwrap();
            prop_assert!(snap.band_upper >= snap.sma_mid);
            prop_assert!(snap.sma_mid >= snap.band_lower);
            prop_assert!(snap.bb_width >= 0.0);
        }

        #[test]
        fn any_short_window_is_insufficient(len in 0usize..20) {
            let engine = IndicatorEngine::new(&SignalSettings::default());
            let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
            let is_insufficient = matches!(
                engine.compute(&window(&closes)),
                Err(Error::InsufficientData { .. })
            );
            prop_assert!(is_insufficient);
        }
    }
}
