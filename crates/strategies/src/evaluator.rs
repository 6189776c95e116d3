// In crates/strategies/src/evaluator.rs

use crate::types::SignalSettings;
use core_types::{Candle, IndicatorSnapshot, Signal, SignalDirection};
use rust_decimal::prelude::*;

/// The RSI + Bollinger Band mean-reversion entry rules.
///
/// LONG: RSI inside the long band, close at or below the lower band, band
/// width inside the volatility filter. SHORT mirrors it on the upper band.
/// When both rule sets match at once the evaluation is treated as a conflict
/// and yields `NONE`.
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    settings: SignalSettings,
}

impl SignalEvaluator {
    pub fn new(settings: SignalSettings) -> Self {
        Self { settings }
    }

    pub fn name(&self) -> &'static str {
        "RsiBollingerReversion"
    }

    /// Evaluates the entry rules for `candle`.
    ///
    /// `snapshot` is `None` while the indicator window is still warming up.
    /// `slot_available` is `false` once the open-position count has reached
    /// the configured maximum.
    pub fn evaluate(
        &self,
        candle: &Candle,
        snapshot: Option<&IndicatorSnapshot>,
        slot_available: bool,
    ) -> Signal {
        if !slot_available {
            return Signal::none(candle.close, candle.open_time, "no position slot available");
        }
        let Some(snap) = snapshot else {
            return Signal::none(candle.close, candle.open_time, "insufficient data");
        };

        let s = &self.settings;
        let close = candle.close.to_f64().unwrap_or(0.0);
        let width_ok = in_range(snap.bb_width, s.bb_width_min, s.bb_width_max);

        let long_rsi = in_range(snap.rsi, s.rsi_long_lower, s.rsi_long_upper);
        let long_price = close <= snap.band_lower;
        let short_rsi = in_range(snap.rsi, s.rsi_short_lower, s.rsi_short_upper);
        let short_price = close >= snap.band_upper;

        let long = long_rsi && long_price && width_ok;
        let short = short_rsi && short_price && width_ok;

        let long_detail = format!(
            "LONG[rsi {:.2} in {}-{} {}, close {:.2} <= lower {:.2} {}, width {:.4} in {}-{} {}]",
            snap.rsi, s.rsi_long_lower, s.rsi_long_upper, mark(long_rsi),
            close, snap.band_lower, mark(long_price),
            snap.bb_width, s.bb_width_min, s.bb_width_max, mark(width_ok),
        );
        let short_detail = format!(
            "SHORT[rsi {:.2} in {}-{} {}, close {:.2} >= upper {:.2} {}, width {:.4} in {}-{} {}]",
            snap.rsi, s.rsi_short_lower, s.rsi_short_upper, mark(short_rsi),
            close, snap.band_upper, mark(short_price),
            snap.bb_width, s.bb_width_min, s.bb_width_max, mark(width_ok),
        );

        let (direction, rationale) = match (long, short) {
            (true, true) => {
                tracing::warn!(rsi = snap.rsi, close, "LONG and SHORT rules both matched; ignoring conflict.");
                (SignalDirection::None, format!("conflict: {long_detail} {short_detail}"))
            }
            (true, false) => (SignalDirection::Long, long_detail),
            (false, true) => (SignalDirection::Short, short_detail),
            (false, false) => (SignalDirection::None, format!("no match: {long_detail} {short_detail}")),
        };

        Signal {
            direction,
            trigger_price: candle.close,
            as_of: candle.open_time,
            rationale,
        }
    }
}

fn in_range(value: f64, lower: f64, upper: f64) -> bool {
    value >= lower && value <= upper
}

fn mark(ok: bool) -> &'static str {
    if ok { "ok" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn candle(close: Decimal) -> Candle {
        Candle {
            open_time: 1_700_000_000_000,
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(10),
            is_closed: true,
        }
    }

    fn snapshot(rsi: f64, lower: f64, upper: f64, width: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi,
            sma_mid: (lower + upper) / 2.0,
            band_upper: upper,
            band_lower: lower,
            bb_width: width,
            as_of: 1_700_000_000_000,
        }
    }

    fn evaluator() -> SignalEvaluator {
        SignalEvaluator::new(SignalSettings::default())
    }

    #[test]
    fn long_when_close_touches_lower_band() {
        let snap = snapshot(32.0, 49000.0, 51000.0, 0.03);
        let signal = evaluator().evaluate(&candle(dec!(49000)), Some(&snap), true);
        assert_eq!(signal.direction, SignalDirection::Long);
        assert_eq!(signal.trigger_price, dec!(49000));
    }

    #[test]
    fn short_when_close_crosses_upper_band() {
        let snap = snapshot(68.0, 49000.0, 51000.0, 0.03);
        let signal = evaluator().evaluate(&candle(dec!(51200)), Some(&snap), true);
        assert_eq!(signal.direction, SignalDirection::Short);
    }

    #[test]
    fn bounds_are_inclusive() {
        for rsi in [30.0, 35.0] {
            let snap = snapshot(rsi, 49000.0, 51000.0, 0.01);
            let signal = evaluator().evaluate(&candle(dec!(48000)), Some(&snap), true);
            assert_eq!(signal.direction, SignalDirection::Long, "rsi {rsi}");
        }
        let snap = snapshot(70.0, 49000.0, 51000.0, 0.08);
        let signal = evaluator().evaluate(&candle(dec!(51000)), Some(&snap), true);
        assert_eq!(signal.direction, SignalDirection::Short);
    }

    #[test]
    fn volatility_filter_blocks_entries() {
        let narrow = snapshot(32.0, 49000.0, 51000.0, 0.005);
        let wide = snapshot(32.0, 49000.0, 51000.0, 0.09);
        for snap in [narrow, wide] {
            let signal = evaluator().evaluate(&candle(dec!(48000)), Some(&snap), true);
            assert_eq!(signal.direction, SignalDirection::None);
        }
    }

    #[test]
    fn no_signal_without_slot_or_data() {
        let snap = snapshot(32.0, 49000.0, 51000.0, 0.03);
        let full = evaluator().evaluate(&candle(dec!(49000)), Some(&snap), false);
        assert_eq!(full.direction, SignalDirection::None);
        assert_eq!(full.rationale, "no position slot available");

        let warming = evaluator().evaluate(&candle(dec!(49000)), None, true);
        assert_eq!(warming.direction, SignalDirection::None);
        assert_eq!(warming.rationale, "insufficient data");
    }

    #[test]
    fn contradictory_rules_yield_none() {
        // Overlapping RSI bands and a collapsed envelope make both rule sets true.
        let settings = SignalSettings {
            rsi_long_lower: 40.0,
            rsi_long_upper: 60.0,
            rsi_short_lower: 40.0,
            rsi_short_upper: 60.0,
            bb_width_min: 0.0,
            ..Default::default()
        };
        let snap = snapshot(50.0, 50000.0, 50000.0, 0.0);
        let signal = SignalEvaluator::new(settings).evaluate(&candle(dec!(50000)), Some(&snap), true);
        assert_eq!(signal.direction, SignalDirection::None);
        assert!(signal.rationale.starts_with("conflict"));
    }

    proptest! {
        #[test]
        fn full_book_never_signals(
            rsi in 0.0..100.0_f64,
            close in 1.0..100_000.0_f64,
            width in 0.0..0.2_f64,
        ) {
            let snap = snapshot(rsi, close * 0.99, close * 1.01, width);
            let c = candle(Decimal::from_f64(close).unwrap());
            let signal = evaluator().evaluate(&c, Some(&snap), false);
            prop_assert_eq!(signal.direction, SignalDirection::None);
        }
    }
}
