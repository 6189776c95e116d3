// In crates/app-config/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Failed to render TOML: {0}")]
    TomlError(#[from] toml::ser::Error),

    #[error("Invalid parameter `{field}`: {reason}")]
    InvalidParameters { field: String, reason: String },
}

impl From<strategies::Error> for Error {
    fn from(e: strategies::Error) -> Self {
        match e {
            strategies::Error::InvalidParameters { field, reason } => Error::InvalidParameters { field, reason },
            other => Error::InvalidParameters {
                field: "strategy".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<risk::Error> for Error {
    fn from(e: risk::Error) -> Self {
        match e {
            risk::Error::InvalidParameters { field, reason } => Error::InvalidParameters { field, reason },
            other => Error::InvalidParameters {
                field: "risk".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<execution::Error> for Error {
    fn from(e: execution::Error) -> Self {
        match e {
            execution::Error::InvalidParameters { field, reason } => Error::InvalidParameters { field, reason },
            other => Error::InvalidParameters {
                field: "execution".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
