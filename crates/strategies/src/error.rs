// In crates/strategies/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Insufficient data: need {required} candles, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter `{field}`: {reason}")]
    InvalidParameters { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
