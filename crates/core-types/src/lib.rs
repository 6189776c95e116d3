// In crates/core-types/src/lib.rs

pub mod types;

// Re-export the most important types for easy access from other crates.
pub use types::{
    Candle, CloseRequest, ClosedTrade, Direction, ExitReason, Fill, IndicatorSnapshot,
    LedgerSnapshot, OrderRequest, Position, PositionStatus, Signal, SignalDirection,
    TrailingState,
};
