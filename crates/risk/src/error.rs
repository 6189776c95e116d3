// In crates/risk/src/error.rs

use core_types::PositionStatus;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Insufficient capital: requested {requested}, available {available}")]
    InsufficientCapital { requested: Decimal, available: Decimal },

    #[error("Position limit exceeded: {open} open, maximum {max}")]
    PositionLimitExceeded { open: usize, max: usize },

    #[error("Invalid state transition for position {position_id}: {from} -> {to}")]
    InvalidStateTransition {
        position_id: u64,
        from: PositionStatus,
        to: PositionStatus,
    },

    #[error("Position {0} not found")]
    PositionNotFound(u64),

    #[error("Signal does not request an entry")]
    NoEntrySignal,

    #[error("Invalid price: {0}")]
    InvalidPrice(Decimal),

    #[error("Invalid parameter `{field}`: {reason}")]
    InvalidParameters { field: String, reason: String },

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

pub type Result<T> = std::result::Result<T, Error>;
