//! Worker error types.

use thiserror::Error;

use spindle_media::MediaError;
use spindle_models::{FailureKind, JobError};
use spindle_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The control API rejected the worker credential. Logged loudly but
    /// never crashes the loop; the next poll retries.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Claim transport or store failure; transient, retried on the next tick.
    #[error("Claim unavailable: {0}")]
    ClaimUnavailable(String),

    /// A terminal report could not be written.
    #[error("Report failed: {0}")]
    ReportFailed(String),

    /// Job execution failed with a known classification.
    #[error("Execution failed ({kind}): {message}")]
    Execution {
        kind: FailureKind,
        message: String,
    },

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn execution(kind: FailureKind, msg: impl Into<String>) -> Self {
        Self::Execution {
            kind,
            message: msg.into(),
        }
    }

    /// Classify this error for the job's terminal `error` field.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            WorkerError::Execution { kind, .. } => *kind,
            WorkerError::Media(MediaError::DownloadFailed { .. })
            | WorkerError::Media(MediaError::DownloadTooLarge { .. }) => FailureKind::Download,
            WorkerError::Media(MediaError::Timeout(_)) => FailureKind::Timeout,
            WorkerError::Media(_) => FailureKind::Render,
            WorkerError::Storage(_) => FailureKind::Upload,
            _ => FailureKind::Internal,
        }
    }

    /// Project into the terminal error recorded on the job.
    pub fn to_job_error(&self) -> JobError {
        JobError::new(self.failure_kind(), self.to_string())
    }
}
