//! Render job records and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Kind of render job. Determines which handler the worker applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Collection poster: a tiled grid of cover images
    Poster,
    /// Animated shelf GIF from a sequence of frames
    Gif,
    /// Seasonal artwork finishing pass (scale + caption)
    Artwork,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Poster => "poster",
            JobKind::Gif => "gif",
            JobKind::Artwork => "artwork",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poster" => Ok(JobKind::Poster),
            "gif" => Ok(JobKind::Gif),
            "artwork" => Ok(JobKind::Artwork),
            other => Err(format!("unknown job kind: {other}")),
        }
    }
}

/// Job lifecycle status.
///
/// Transitions are forward-only: `pending -> claimed -> {completed, failed}`.
/// The single backward transition (`failed -> pending`) is an explicit
/// administrative retry, never taken by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the pool for a worker
    #[default]
    Pending,
    /// Atomically claimed by exactly one worker
    Claimed,
    /// Worker reported success
    Completed,
    /// Worker (or the stale-claim reaper) reported failure
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Claimed => "claimed",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no further worker writes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of a job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Fetching a source asset failed
    Download,
    /// The rendering tool failed or produced no output
    Render,
    /// Uploading the artifact failed
    Upload,
    /// Execution exceeded the bounded render timeout
    Timeout,
    /// The claim went stale (worker died without a terminal report)
    StaleClaim,
    /// Anything else (bad payload, panic, unexpected I/O)
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Download => "download",
            FailureKind::Render => "render",
            FailureKind::Upload => "upload",
            FailureKind::Timeout => "timeout",
            FailureKind::StaleClaim => "stale_claim",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal error recorded on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    /// Failure classification
    pub kind: FailureKind,
    /// Human-readable message
    pub message: String,
}

impl JobError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Terminal result recorded on a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResult {
    /// Public URL of the rendered artifact
    pub artifact_url: String,
    /// MIME type of the artifact
    pub content_type: String,
    /// Artifact size in bytes, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// A render job as stored in the job pool.
///
/// The store owns the authoritative state; a worker only ever holds a
/// transient copy of the single job it is processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    /// Unique job ID, assigned at creation, immutable
    pub id: JobId,

    /// Job kind
    pub kind: JobKind,

    /// Lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Kind-specific input, opaque to the claim machinery
    pub payload: serde_json::Value,

    /// Worker currently (or last) holding the claim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,

    /// When the claim was taken (staleness detection)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,

    /// Number of claim attempts, incremented on each claim
    #[serde(default)]
    pub attempts: i32,

    /// Terminal result (completed jobs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RenderResult>,

    /// Terminal error (failed jobs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl RenderJob {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply the claim transition. Only meaningful on a `pending` job;
    /// callers (the store implementations) enforce that precondition.
    pub fn claim(&mut self, worker_id: &str) {
        self.status = JobStatus::Claimed;
        self.claimed_by = Some(worker_id.to_string());
        self.claimed_at = Some(Utc::now());
        self.attempts += 1;
        self.updated_at = Utc::now();
    }

    /// Apply the success transition.
    pub fn complete(&mut self, result: RenderResult) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.updated_at = Utc::now();
    }

    /// Apply the failure transition.
    pub fn fail(&mut self, error: JobError) {
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.updated_at = Utc::now();
    }

    /// Apply the administrative retry transition (`failed -> pending`).
    pub fn reset_for_retry(&mut self) {
        self.status = JobStatus::Pending;
        self.claimed_by = None;
        self.claimed_at = None;
        self.error = None;
        self.updated_at = Utc::now();
    }
}

/// Input for creating a render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRenderJob {
    pub kind: JobKind,
    pub payload: serde_json::Value,
}

impl NewRenderJob {
    pub fn new(kind: JobKind, payload: serde_json::Value) -> Self {
        Self { kind, payload }
    }

    /// Materialize a pending job record.
    pub fn into_job(self) -> RenderJob {
        let now = Utc::now();
        RenderJob {
            id: JobId::new(),
            kind: self.kind,
            status: JobStatus::Pending,
            payload: self.payload,
            claimed_by: None,
            claimed_at: None,
            attempts: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-status job totals for admin/metrics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct JobCounts {
    pub pending: u64,
    pub claimed: u64,
    pub completed: u64,
    pub failed: u64,
}

impl JobCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.claimed + self.completed + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_job() -> RenderJob {
        NewRenderJob::new(JobKind::Poster, serde_json::json!({"cover_urls": []})).into_job()
    }

    #[test]
    fn test_job_lifecycle_transitions() {
        let mut job = pending_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);

        job.claim("render-worker-1");
        assert_eq!(job.status, JobStatus::Claimed);
        assert_eq!(job.claimed_by.as_deref(), Some("render-worker-1"));
        assert!(job.claimed_at.is_some());
        assert_eq!(job.attempts, 1);
        assert!(!job.is_terminal());

        job.complete(RenderResult {
            artifact_url: "https://cdn.example.com/posters/x.jpg".into(),
            content_type: "image/jpeg".into(),
            size_bytes: Some(1024),
        });
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.is_terminal());
    }

    #[test]
    fn test_retry_resets_claim_fields_but_keeps_attempts() {
        let mut job = pending_job();
        job.claim("w1");
        job.fail(JobError::new(FailureKind::Render, "ffmpeg exited 1"));
        assert!(job.is_terminal());

        job.reset_for_retry();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.claimed_by.is_none());
        assert!(job.claimed_at.is_none());
        assert!(job.error.is_none());
        assert_eq!(job.attempts, 1);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [JobKind::Poster, JobKind::Gif, JobKind::Artwork] {
            assert_eq!(kind.as_str().parse::<JobKind>().unwrap(), kind);
        }
        assert!("christmas".parse::<JobKind>().is_err());
    }

    #[test]
    fn test_status_serde_wire_names() {
        let json = serde_json::to_string(&JobStatus::Claimed).unwrap();
        assert_eq!(json, "\"claimed\"");
        let status: JobStatus = serde_json::from_str("\"failed\"").unwrap();
        assert!(status.is_terminal());
    }
}
