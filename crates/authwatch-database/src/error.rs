//! Database error types.

use crate::migration::MigrationError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("Pool health check failed: {0}")]
    HealthCheck(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DbError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for authwatch_common_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Timeout(limit) => Self::Timeout(limit),
            DbError::InvalidConfig(msg) => Self::Config(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}
