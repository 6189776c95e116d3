// In crates/core-types/src/types.rs

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Market Data ---

/// A single finalized price candle for the traded instrument.
///
/// Candles are immutable once finalized. `open_time` is a Unix timestamp in
/// milliseconds and is used to order candles within the rolling window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// `false` for an in-progress bar. The engine ignores these.
    #[serde(default = "default_closed")]
    pub is_closed: bool,
}

fn default_closed() -> bool {
    true
}

// --- Direction & Signals ---

/// The side of a position or entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// `1` for long, `-1` for short. Used to sign PnL and price excursions.
    pub fn sign(self) -> Decimal {
        match self {
            Direction::Long => dec!(1),
            Direction::Short => dec!(-1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// The outcome of a signal evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalDirection {
    Long,
    Short,
    None,
}

impl SignalDirection {
    /// The position direction this signal asks for, if any.
    pub fn as_entry(self) -> Option<Direction> {
        match self {
            SignalDirection::Long => Some(Direction::Long),
            SignalDirection::Short => Some(Direction::Short),
            SignalDirection::None => None,
        }
    }
}

/// An entry signal produced by the signal evaluator. Consumed once, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: SignalDirection,
    /// The close of the candle that produced the signal.
    pub trigger_price: Decimal,
    /// `open_time` of that candle.
    pub as_of: i64,
    /// Human-readable account of which conditions passed or failed.
    pub rationale: String,
}

impl Signal {
    pub fn none(trigger_price: Decimal, as_of: i64, rationale: impl Into<String>) -> Self {
        Self {
            direction: SignalDirection::None,
            trigger_price,
            as_of,
            rationale: rationale.into(),
        }
    }

    pub fn is_entry(&self) -> bool {
        self.direction != SignalDirection::None
    }
}

// --- Indicators ---

/// The latest indicator values computed over the rolling candle window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub sma_mid: f64,
    pub band_upper: f64,
    pub band_lower: f64,
    pub bb_width: f64,
    pub as_of: i64,
}

// --- Positions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrailingState {
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::Open => write!(f, "OPEN"),
            PositionStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Represents the single tracked leveraged position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: u64,
    pub direction: Direction,
    /// The confirmed fill price of the entry order.
    pub entry_price: Decimal,
    /// Quantity in the base asset (notional / entry price).
    pub size: Decimal,
    /// Position value before leverage.
    pub notional: Decimal,
    /// Capital reserved in the ledger to back this position (notional / leverage).
    pub margin: Decimal,
    pub leverage: u32,
    pub opened_at: i64,
    pub stop_loss_price: Decimal,
    pub take_profit_price: Decimal,
    pub trailing_state: TrailingState,
    pub trail_stop_price: Option<Decimal>,
    pub status: PositionStatus,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Signed PnL in quote currency if the position were closed at `exit_price`.
    pub fn pnl_at(&self, exit_price: Decimal) -> Decimal {
        self.direction.sign() * (exit_price - self.entry_price) / self.entry_price * self.notional
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TrailingStop,
    Manual,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TrailingStop => "TRAILING_STOP",
            ExitReason::Manual => "MANUAL",
        };
        f.write_str(label)
    }
}

/// An entry in the append-only trade history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub position_id: u64,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub exit_reason: ExitReason,
    pub pnl: Decimal,
    pub opened_at: i64,
    pub closed_at: i64,
}

// --- Capital ---

/// A fully-derived view of the capital ledger for observers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub total_capital: Decimal,
    pub cap: Decimal,
    pub reserved_capital: Decimal,
    pub available_capital: Decimal,
    pub surplus: Decimal,
}

// --- Orders ---

/// A request to open a position on the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub direction: Direction,
    /// Quantity in the base asset.
    pub size: Decimal,
    pub leverage: u32,
    /// The price the engine expects to trade at (last close). The exchange
    /// reports the real fill.
    pub reference_price: Decimal,
}

/// A request to flatten an open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseRequest {
    pub position_id: u64,
    /// The side of the position being closed (the closing order is the opposite).
    pub direction: Direction,
    pub size: Decimal,
    pub reference_price: Decimal,
}

/// A confirmed fill reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: Decimal,
    pub size: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_position() -> Position {
        Position {
            id: 1,
            direction: Direction::Long,
            entry_price: dec!(50000),
            size: dec!(0.2),
            notional: dec!(10000),
            margin: dec!(2000),
            leverage: 5,
            opened_at: 0,
            stop_loss_price: dec!(49375),
            take_profit_price: dec!(52750),
            trailing_state: TrailingState::Inactive,
            trail_stop_price: None,
            status: PositionStatus::Open,
        }
    }

    #[test]
    fn pnl_is_signed_by_direction() {
        let mut pos = long_position();
        assert_eq!(pos.pnl_at(dec!(51000)), dec!(200));
        assert_eq!(pos.pnl_at(dec!(49000)), dec!(-200));

        pos.direction = Direction::Short;
        assert_eq!(pos.pnl_at(dec!(51000)), dec!(-200));
        assert_eq!(pos.pnl_at(dec!(49000)), dec!(200));
    }

    #[test]
    fn candle_defaults_to_closed_when_flag_missing() {
        let json = r#"{"open_time":1,"open":"1","high":"2","low":"0.5","close":"1.5","volume":"10"}"#;
        let candle: Candle = serde_json::from_str(json).unwrap();
        assert!(candle.is_closed);
    }

    #[test]
    fn enums_serialize_in_screaming_case() {
        assert_eq!(serde_json::to_string(&ExitReason::TrailingStop).unwrap(), "\"TRAILING_STOP\"");
        assert_eq!(serde_json::to_string(&Direction::Long).unwrap(), "\"LONG\"");
        assert_eq!(ExitReason::StopLoss.to_string(), "STOP_LOSS");
    }
}
