//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur against the job store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store itself could not be reached or the RPC failed.
    /// Transient from the caller's point of view; job state is unchanged.
    #[error("Job store unavailable: {0}")]
    Unavailable(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    /// An ownership or lifecycle guard rejected the write
    /// (wrong worker, or a transition that would move status backward).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".into()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}
