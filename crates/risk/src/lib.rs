// In crates/risk/src/lib.rs

pub mod error;
pub mod ledger;
pub mod monitor;
pub mod position_manager;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use ledger::CapitalLedger;
pub use monitor::{ExitTrigger, RiskMonitor};
pub use position_manager::{OpenPlan, PositionManager, TradeBook};
pub use types::RiskSettings;
