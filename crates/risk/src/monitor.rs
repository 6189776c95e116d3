// In crates/risk/src/monitor.rs

use crate::position_manager::TradeBook;
use crate::types::RiskSettings;
use core_types::{Candle, Direction, ExitReason, Position, TrailingState};
use rust_decimal::Decimal;

/// A close the monitor wants executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitTrigger {
    pub position_id: u64,
    pub reason: ExitReason,
    /// The breached level, used as the reference price for the close order.
    pub reference_price: Decimal,
}

/// Checks an open position against its exit rules once per candle.
///
/// Evaluation order is fixed: stop-loss, take-profit, trailing stop. The
/// first breach wins, so a candle that spans both the stop-loss and the
/// take-profit closes at the stop-loss.
#[derive(Debug, Clone)]
pub struct RiskMonitor {
    trailing_enabled: bool,
    activation: Decimal,
    distance: Decimal,
}

impl RiskMonitor {
    pub fn new(settings: &RiskSettings) -> Self {
        Self {
            trailing_enabled: settings.trailing_enabled,
            activation: settings.trailing_activation_fraction(),
            distance: settings.trailing_distance_fraction(),
        }
    }

    /// Runs [`Self::check`] for every open position in the book except
    /// those `skip` selects. Skipped positions keep their trailing state.
    pub fn check_book(&self, book: &mut TradeBook, candle: &Candle, skip: impl Fn(u64) -> bool) -> Vec<ExitTrigger> {
        book.open_positions_mut()
            .iter_mut()
            .filter(|pos| !skip(pos.id))
            .filter_map(|pos| self.check(pos, candle))
            .collect()
    }

    /// Evaluates `position` against `candle`, updating its trailing state.
    ///
    /// Breaches are detected on the candle extremes: the low for a long's
    /// stops and the high for its target (mirrored for shorts).
    pub fn check(&self, position: &mut Position, candle: &Candle) -> Option<ExitTrigger> {
        let (adverse, favourable) = match position.direction {
            Direction::Long => (candle.low, candle.high),
            Direction::Short => (candle.high, candle.low),
        };
        let trigger = |reason, reference_price| ExitTrigger {
            position_id: position.id,
            reason,
            reference_price,
        };

        // 1. Stop-loss
        if crossed_against(position.direction, adverse, position.stop_loss_price) {
            tracing::warn!(
                position_id = position.id,
                price = %adverse,
                stop_loss = %position.stop_loss_price,
                "Stop-loss triggered."
            );
            return Some(trigger(ExitReason::StopLoss, position.stop_loss_price));
        }

        // 2. Take-profit
        if crossed_favourably(position.direction, favourable, position.take_profit_price) {
            tracing::info!(
                position_id = position.id,
                price = %favourable,
                take_profit = %position.take_profit_price,
                "Take-profit triggered."
            );
            return Some(trigger(ExitReason::TakeProfit, position.take_profit_price));
        }

        // 3. Trailing stop
        if !self.trailing_enabled {
            return None;
        }

        // A retrace is judged against the level in force before this candle.
        if position.trailing_state == TrailingState::Active {
            if let Some(trail) = position.trail_stop_price {
                if crossed_against(position.direction, adverse, trail) {
                    tracing::info!(
                        position_id = position.id,
                        price = %adverse,
                        trail_stop = %trail,
                        "Trailing stop triggered."
                    );
                    return Some(trigger(ExitReason::TrailingStop, trail));
                }
            }
        }

        self.advance_trail(position, favourable);
        None
    }

    fn advance_trail(&self, position: &mut Position, favourable: Decimal) {
        let candidate = match position.direction {
            Direction::Long => favourable * (Decimal::ONE - self.distance),
            Direction::Short => favourable * (Decimal::ONE + self.distance),
        };

        match (position.trailing_state, position.trail_stop_price) {
            (TrailingState::Inactive, _) => {
                let excursion =
                    position.direction.sign() * (favourable - position.entry_price) / position.entry_price;
                if excursion >= self.activation {
                    position.trailing_state = TrailingState::Active;
                    position.trail_stop_price = Some(candidate);
                    tracing::info!(
                        position_id = position.id,
                        price = %favourable,
                        trail_stop = %candidate,
                        "Trailing stop activated."
                    );
                }
            }
            (TrailingState::Active, Some(current)) => {
                let tighter = match position.direction {
                    Direction::Long => candidate > current,
                    Direction::Short => candidate < current,
                };
                if tighter {
                    position.trail_stop_price = Some(candidate);
                    tracing::debug!(position_id = position.id, trail_stop = %candidate, "Trailing stop tightened.");
                }
            }
            (TrailingState::Active, None) => {
                position.trail_stop_price = Some(candidate);
            }
        }
    }
}

fn crossed_against(direction: Direction, price: Decimal, level: Decimal) -> bool {
    match direction {
        Direction::Long => price <= level,
        Direction::Short => price >= level,
    }
}

fn crossed_favourably(direction: Direction, price: Decimal, level: Decimal) -> bool {
    match direction {
        Direction::Long => price >= level,
        Direction::Short => price <= level,
    }
}
