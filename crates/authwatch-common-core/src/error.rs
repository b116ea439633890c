//! Error types for authwatch.

use std::time::Duration;
use thiserror::Error;

/// The error taxonomy surfaced to callers of the audit engine.
#[derive(Error, Debug)]
pub enum Error {
    /// The store is unreachable or corrupt. Fatal to the current call.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A storage call did not complete within the operation timeout.
    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// Malformed input, rejected before anything is written.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a new storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error originates from the storage layer (including timeouts).
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Timeout(_))
    }

    /// Whether the input was rejected.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using authwatch's Error.
pub type Result<T> = std::result::Result<T, Error>;
