// In crates/risk/src/position_manager.rs

use crate::ledger::CapitalLedger;
use crate::types::RiskSettings;
use crate::{Error, Result};
use core_types::{
    ClosedTrade, Direction, ExitReason, Fill, OrderRequest, Position, PositionStatus, Signal,
    TrailingState,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ledger, open positions and trade history, mutated only through
/// [`PositionManager`] and [`crate::RiskMonitor`].
///
/// Deserialization goes through [`TradeBook::from_parts`], so a persisted book
/// with broken invariants is rejected instead of resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TradeBookParts")]
pub struct TradeBook {
    ledger: CapitalLedger,
    open_positions: Vec<Position>,
    trade_history: Vec<ClosedTrade>,
    next_position_id: u64,
}

#[derive(Deserialize)]
struct TradeBookParts {
    ledger: CapitalLedger,
    open_positions: Vec<Position>,
    trade_history: Vec<ClosedTrade>,
    next_position_id: u64,
}

impl TryFrom<TradeBookParts> for TradeBook {
    type Error = Error;

    fn try_from(parts: TradeBookParts) -> Result<Self> {
        TradeBook::from_parts(
            parts.ledger,
            parts.open_positions,
            parts.trade_history,
            parts.next_position_id,
        )
    }
}

impl TradeBook {
    pub fn new(ledger: CapitalLedger) -> Self {
        Self {
            ledger,
            open_positions: Vec::new(),
            trade_history: Vec::new(),
            next_position_id: 1,
        }
    }

    /// Reassembles a book from persisted state, checking that
    /// reserved capital equals the margin of the open positions.
    pub fn from_parts(
        ledger: CapitalLedger,
        open_positions: Vec<Position>,
        trade_history: Vec<ClosedTrade>,
        next_position_id: u64,
    ) -> Result<Self> {
        let mut ids = HashSet::new();
        for pos in &open_positions {
            if !pos.is_open() {
                return Err(Error::CorruptSnapshot(format!("position {} is not OPEN", pos.id)));
            }
            if pos.entry_price <= Decimal::ZERO || pos.margin <= Decimal::ZERO {
                return Err(Error::CorruptSnapshot(format!(
                    "position {} has a non-positive entry price or margin",
                    pos.id
                )));
            }
            if !ids.insert(pos.id) {
                return Err(Error::CorruptSnapshot(format!("duplicate position id {}", pos.id)));
            }
        }
        if let Some(trade) = trade_history.iter().find(|t| ids.contains(&t.position_id)) {
            return Err(Error::CorruptSnapshot(format!(
                "position {} is both open and closed",
                trade.position_id
            )));
        }

        let margins: Decimal = open_positions.iter().map(|p| p.margin).sum();
        if margins != ledger.reserved_capital() {
            return Err(Error::CorruptSnapshot(format!(
                "reserved capital {} does not match open margin {}",
                ledger.reserved_capital(),
                margins
            )));
        }

        let highest_id = open_positions
            .iter()
            .map(|p| p.id)
            .chain(trade_history.iter().map(|t| t.position_id))
            .max()
            .unwrap_or(0);

        Ok(Self {
            ledger,
            open_positions,
            trade_history,
            next_position_id: next_position_id.max(highest_id + 1),
        })
    }

    pub fn ledger(&self) -> &CapitalLedger {
        &self.ledger
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.open_positions
    }

    pub fn open_count(&self) -> usize {
        self.open_positions.len()
    }

    pub fn position(&self, id: u64) -> Option<&Position> {
        self.open_positions.iter().find(|p| p.id == id)
    }

    pub fn trade_history(&self) -> &[ClosedTrade] {
        &self.trade_history
    }

    pub fn next_position_id(&self) -> u64 {
        self.next_position_id
    }

    /// Sum of realized PnL over the trade history.
    pub fn realized_pnl(&self) -> Decimal {
        self.trade_history.iter().map(|t| t.pnl).sum()
    }

    /// External capital updates bypass position logic but never touch reservations.
    pub fn adjust_total_capital(&mut self, delta: Decimal) {
        self.ledger.adjust_total_capital(delta);
    }

    pub fn set_total_capital(&mut self, total: Decimal) {
        self.ledger.set_total_capital(total);
    }

    pub fn set_cap(&mut self, cap: Decimal) {
        self.ledger.set_cap(cap);
    }

    pub(crate) fn open_positions_mut(&mut self) -> &mut [Position] {
        &mut self.open_positions
    }
}

/// A sized entry that has passed the position-limit and capital checks but
/// has not been committed to the book.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPlan {
    pub direction: Direction,
    pub notional: Decimal,
    pub margin: Decimal,
    pub leverage: u32,
    pub reference_price: Decimal,
}

impl OpenPlan {
    /// The exchange order for this plan, sized at the reference price.
    pub fn order_request(&self) -> OrderRequest {
        OrderRequest {
            direction: self.direction,
            size: self.notional / self.reference_price,
            leverage: self.leverage,
            reference_price: self.reference_price,
        }
    }
}

/// Opens and closes positions, keeping the ledger in step.
///
/// Every operation either applies completely or leaves the book untouched.
#[derive(Debug, Clone)]
pub struct PositionManager {
    settings: RiskSettings,
}

impl PositionManager {
    pub fn new(settings: RiskSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RiskSettings {
        &self.settings
    }

    /// Takes effect for positions opened afterwards.
    pub fn update_settings(&mut self, settings: RiskSettings) {
        self.settings = settings;
    }

    /// Sizes an entry for `signal` without mutating anything.
    ///
    /// The margin reservation is staged against a copy of the ledger so a
    /// plan is only returned when the real reservation would succeed.
    pub fn plan_open(&self, book: &TradeBook, signal: &Signal) -> Result<OpenPlan> {
        let direction = signal.direction.as_entry().ok_or(Error::NoEntrySignal)?;
        if signal.trigger_price <= Decimal::ZERO {
            return Err(Error::InvalidPrice(signal.trigger_price));
        }
        self.check_slot(book)?;

        let notional = book.ledger.operating_capital() * self.settings.capital_fraction();
        let margin = notional / Decimal::from(self.settings.leverage);

        let mut staged = book.ledger.clone();
        staged.reserve(margin)?;

        Ok(OpenPlan {
            direction,
            notional,
            margin,
            leverage: self.settings.leverage,
            reference_price: signal.trigger_price,
        })
    }

    /// Commits `plan` with the confirmed exchange `fill`.
    pub fn open(&self, book: &mut TradeBook, plan: &OpenPlan, fill: Fill, opened_at: i64) -> Result<Position> {
        if fill.price <= Decimal::ZERO {
            return Err(Error::InvalidPrice(fill.price));
        }
        self.check_slot(book)?;
        book.ledger.reserve(plan.margin)?;

        let (stop_loss_price, take_profit_price) = self.exit_levels(plan.direction, fill.price);
        let position = Position {
            id: book.next_position_id,
            direction: plan.direction,
            entry_price: fill.price,
            size: plan.notional / fill.price,
            notional: plan.notional,
            margin: plan.margin,
            leverage: plan.leverage,
            opened_at,
            stop_loss_price,
            take_profit_price,
            trailing_state: TrailingState::Inactive,
            trail_stop_price: None,
            status: PositionStatus::Open,
        };
        book.next_position_id += 1;
        book.open_positions.push(position.clone());

        tracing::info!(
            target: "operations",
            action = "OPEN",
            position_id = position.id,
            direction = %position.direction,
            size = %position.size,
            price = %position.entry_price,
            capital = %position.margin,
            stop_loss = %position.stop_loss_price,
            take_profit = %position.take_profit_price,
            "Position opened."
        );
        Ok(position)
    }

    /// Plans and commits an entry filled at the signal's trigger price.
    pub fn open_at_signal(&self, book: &mut TradeBook, signal: &Signal, opened_at: i64) -> Result<Position> {
        let plan = self.plan_open(book, signal)?;
        let fill = Fill {
            price: plan.reference_price,
            size: plan.notional / plan.reference_price,
        };
        self.open(book, &plan, fill, opened_at)
    }

    /// Closes an open position at the confirmed `exit_price`.
    ///
    /// A position can be closed exactly once; closing it again fails with
    /// [`Error::InvalidStateTransition`].
    pub fn close(
        &self,
        book: &mut TradeBook,
        position_id: u64,
        exit_price: Decimal,
        reason: ExitReason,
        closed_at: i64,
    ) -> Result<(Position, ClosedTrade)> {
        let Some(index) = book.open_positions.iter().position(|p| p.id == position_id) else {
            if book.trade_history.iter().any(|t| t.position_id == position_id) {
                return Err(Error::InvalidStateTransition {
                    position_id,
                    from: PositionStatus::Closed,
                    to: PositionStatus::Closed,
                });
            }
            return Err(Error::PositionNotFound(position_id));
        };
        if exit_price <= Decimal::ZERO {
            return Err(Error::InvalidPrice(exit_price));
        }

        let mut position = book.open_positions.remove(index);
        let pnl = position.pnl_at(exit_price);
        book.ledger.release(position.margin, pnl);
        position.status = PositionStatus::Closed;

        let trade = ClosedTrade {
            position_id,
            direction: position.direction,
            entry_price: position.entry_price,
            exit_price,
            exit_reason: reason,
            pnl,
            opened_at: position.opened_at,
            closed_at,
        };
        book.trade_history.push(trade.clone());

        let pnl_pct = if position.margin.is_zero() {
            Decimal::ZERO
        } else {
            (pnl / position.margin * dec!(100)).round_dp(2)
        };
        tracing::info!(
            target: "operations",
            action = "CLOSE",
            position_id,
            direction = %position.direction,
            size = %position.size,
            price = %exit_price,
            capital = %position.margin,
            pnl = %pnl.round_dp(2),
            pnl_pct = %pnl_pct,
            reason = %reason,
            entry_price = %position.entry_price,
            duration_secs = (closed_at - position.opened_at) / 1000,
            "Position closed."
        );
        Ok((position, trade))
    }

    fn check_slot(&self, book: &TradeBook) -> Result<()> {
        let open = book.open_positions.len();
        if open >= self.settings.max_positions {
            return Err(Error::PositionLimitExceeded {
                open,
                max: self.settings.max_positions,
            });
        }
        Ok(())
    }

    /// Stop-loss and take-profit prices for an entry at `entry`.
    pub fn exit_levels(&self, direction: Direction, entry: Decimal) -> (Decimal, Decimal) {
        let sl = self.settings.stop_loss_fraction();
        let tp = self.settings.take_profit_fraction();
        match direction {
            Direction::Long => (entry * (Decimal::ONE - sl), entry * (Decimal::ONE + tp)),
            Direction::Short => (entry * (Decimal::ONE + sl), entry * (Decimal::ONE - tp)),
        }
    }
}
