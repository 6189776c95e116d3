// In crates/execution/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The venue refused the order. Retrying the same request will not help.
    #[error("Order rejected: {reason}")]
    Rejected { reason: String },

    /// A timeout, dropped connection or similar; the call may succeed if repeated.
    #[error("Exchange call failed: {reason}")]
    Transient { reason: String },

    #[error("Invalid parameter `{field}`: {reason}")]
    InvalidParameters { field: String, reason: String },
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
