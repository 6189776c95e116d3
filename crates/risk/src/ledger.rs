// In crates/risk/src/ledger.rs

use crate::{Error, Result};
use core_types::LedgerSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tracks total, reserved and available capital against a hard operating cap.
///
/// Only `total_capital`, `cap` and `reserved_capital` are stored. Available
/// capital and surplus are always derived:
///
/// * `available = max(0, min(total, cap) - reserved)`
/// * `surplus = max(0, total - cap)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LedgerParts")]
pub struct CapitalLedger {
    total_capital: Decimal,
    cap: Decimal,
    reserved_capital: Decimal,
}

#[derive(Deserialize)]
struct LedgerParts {
    total_capital: Decimal,
    cap: Decimal,
    reserved_capital: Decimal,
}

impl TryFrom<LedgerParts> for CapitalLedger {
    type Error = Error;

    fn try_from(parts: LedgerParts) -> Result<Self> {
        CapitalLedger::from_parts(parts.total_capital, parts.cap, parts.reserved_capital)
    }
}

impl CapitalLedger {
    pub fn new(total_capital: Decimal, cap: Decimal) -> Self {
        Self {
            total_capital,
            cap,
            reserved_capital: Decimal::ZERO,
        }
    }

    /// Rebuilds a ledger from persisted parts. Used by snapshot restore.
    pub fn from_parts(total_capital: Decimal, cap: Decimal, reserved_capital: Decimal) -> Result<Self> {
        if cap <= Decimal::ZERO {
            return Err(Error::CorruptSnapshot(format!("ledger cap must be positive, got {cap}")));
        }
        if reserved_capital < Decimal::ZERO {
            return Err(Error::CorruptSnapshot(format!(
                "reserved capital must not be negative, got {reserved_capital}"
            )));
        }
        Ok(Self {
            total_capital,
            cap,
            reserved_capital,
        })
    }

    pub fn total_capital(&self) -> Decimal {
        self.total_capital
    }

    pub fn cap(&self) -> Decimal {
        self.cap
    }

    pub fn reserved_capital(&self) -> Decimal {
        self.reserved_capital
    }

    /// The part of total capital the engine is allowed to trade with.
    pub fn operating_capital(&self) -> Decimal {
        self.total_capital.min(self.cap).max(Decimal::ZERO)
    }

    pub fn available_capital(&self) -> Decimal {
        (self.operating_capital() - self.reserved_capital).max(Decimal::ZERO)
    }

    pub fn surplus(&self) -> Decimal {
        (self.total_capital - self.cap).max(Decimal::ZERO)
    }

    /// Sets `amount` aside as margin.
    ///
    /// Fails with [`Error::InsufficientCapital`] and leaves the ledger
    /// untouched if `amount` is not positive or exceeds available capital.
    pub fn reserve(&mut self, amount: Decimal) -> Result<()> {
        let available = self.available_capital();
        if amount <= Decimal::ZERO || amount > available {
            return Err(Error::InsufficientCapital {
                requested: amount,
                available,
            });
        }
        self.reserved_capital += amount;
        tracing::debug!(%amount, reserved = %self.reserved_capital, "Capital reserved.");
        Ok(())
    }

    /// Returns `amount` of margin and books the realized PnL.
    ///
    /// Reserved capital never goes below zero.
    pub fn release(&mut self, amount: Decimal, realized_pnl: Decimal) {
        if amount > self.reserved_capital {
            tracing::warn!(
                %amount,
                reserved = %self.reserved_capital,
                "Releasing more margin than is reserved; clamping to zero."
            );
        }
        self.reserved_capital = (self.reserved_capital - amount).max(Decimal::ZERO);
        self.total_capital += realized_pnl;
        tracing::debug!(%amount, %realized_pnl, total = %self.total_capital, "Capital released.");
    }

    /// Applies an external change to total capital (funding, fees).
    pub fn adjust_total_capital(&mut self, delta: Decimal) {
        self.total_capital += delta;
    }

    /// Overwrites total capital with a balance reported by the exchange.
    pub fn set_total_capital(&mut self, total_capital: Decimal) {
        self.total_capital = total_capital;
    }

    pub fn set_cap(&mut self, cap: Decimal) {
        self.cap = cap;
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            total_capital: self.total_capital,
            cap: self.cap,
            reserved_capital: self.reserved_capital,
            available_capital: self.available_capital(),
            surplus: self.surplus(),
        }
    }
}
