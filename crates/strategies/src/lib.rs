// In crates/strategies/src/lib.rs

pub mod error;
pub mod evaluator;
pub mod indicators;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use evaluator::SignalEvaluator;
pub use indicators::IndicatorEngine;
pub use types::SignalSettings;
