// In crates/events/src/lib.rs

use chrono::{DateTime, Utc};
use core_types::{ClosedTrade, Direction, IndicatorSnapshot, LedgerSnapshot, Position, Signal};
use serde::{Deserialize, Serialize};

/// A timestamped notification published by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl EngineEvent {
    /// Stamps `kind` with the current wall-clock time.
    pub fn now(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Represents a log line forwarded from the tracing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub level: String,
    pub message: String,
}

/// `tag` and `content` give every event the same `{type, payload}` shape on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventKind {
    SignalEvaluated {
        signal: Signal,
        /// `None` while the window is still warming up.
        snapshot: Option<IndicatorSnapshot>,
    },
    PositionOpened {
        position: Position,
    },
    PositionClosed {
        position: Position,
        trade: ClosedTrade,
    },
    LedgerUpdated {
        ledger: LedgerSnapshot,
    },
    OpenFailed {
        direction: Direction,
        reason: String,
    },
    CloseFailed {
        position_id: u64,
        reason: String,
    },
    /// An action refused by the risk rules (capital, position limit).
    ActionRejected {
        reason: String,
    },
    InvariantViolation {
        position_id: u64,
        reason: String,
    },
    StateChanged {
        running: bool,
    },
    Log(LogLine),
}

impl EventKind {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SignalEvaluated { .. } => "SignalEvaluated",
            EventKind::PositionOpened { .. } => "PositionOpened",
            EventKind::PositionClosed { .. } => "PositionClosed",
            EventKind::LedgerUpdated { .. } => "LedgerUpdated",
            EventKind::OpenFailed { .. } => "OpenFailed",
            EventKind::CloseFailed { .. } => "CloseFailed",
            EventKind::ActionRejected { .. } => "ActionRejected",
            EventKind::InvariantViolation { .. } => "InvariantViolation",
            EventKind::StateChanged { .. } => "StateChanged",
            EventKind::Log(_) => "Log",
        }
    }
}
