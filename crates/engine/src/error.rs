// In crates/engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Risk(#[from] risk::Error),

    #[error(transparent)]
    Config(#[from] app_config::Error),

    #[error("Exchange call failed after retries: {0}")]
    ExchangeCallFailure(#[from] execution::Error),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Engine task has shut down")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
