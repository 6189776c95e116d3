// In crates/engine/src/snapshot.rs

use crate::{Error, Result};
use core_types::{ClosedTrade, Position};
use risk::{CapitalLedger, TradeBook};
use serde::{Deserialize, Serialize};

/// The persisted form of the trade book, used for restart recovery.
///
/// Only stored quantities are written. Available capital and surplus are
/// recomputed on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub ledger: CapitalLedger,
    pub open_positions: Vec<Position>,
    pub trade_history: Vec<ClosedTrade>,
    pub next_position_id: u64,
}

impl EngineSnapshot {
    pub fn from_book(book: &TradeBook) -> Self {
        Self {
            ledger: book.ledger().clone(),
            open_positions: book.open_positions().to_vec(),
            trade_history: book.trade_history().to_vec(),
            next_position_id: book.next_position_id(),
        }
    }

    /// Validates the snapshot and rebuilds the book from it.
    pub fn into_book(self, max_positions: usize) -> Result<TradeBook> {
        if self.open_positions.len() > max_positions {
            return Err(Error::CorruptSnapshot(format!(
                "{} open positions exceed the limit of {max_positions}",
                self.open_positions.len()
            )));
        }
        TradeBook::from_parts(
            self.ledger,
            self.open_positions,
            self.trade_history,
            self.next_position_id,
        )
        .map_err(|e| match e {
            risk::Error::CorruptSnapshot(reason) => Error::CorruptSnapshot(reason),
            other => Error::CorruptSnapshot(other.to_string()),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot. Ledger-level corruption (negative reservations,
    /// non-positive cap) is already rejected here.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::CorruptSnapshot(e.to_string()))
    }
}
