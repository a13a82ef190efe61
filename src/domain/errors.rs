//! Domain errors for the basin-watch detector.
//!
//! Detection, registry and basin logic never fail. Only the persistence
//! boundary produces these errors, and the detector absorbs them.

use thiserror::Error;

/// Errors raised at the persistence boundary.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Persistence write timed out after {0}ms")]
    Timeout(u64),

    #[error("Persistence queue closed")]
    ChannelClosed,

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
