//! The job store repository trait.

use std::time::Duration;

use async_trait::async_trait;

use spindle_models::{JobCounts, JobError, JobId, JobKind, NewRenderJob, RenderJob, RenderResult};

use crate::error::StoreResult;

/// Authoritative record of render job state.
///
/// The claim is the only way a job moves `pending -> claimed`, and it is
/// atomic: for any job, at most one successful claim ever occurs
/// system-wide. Terminal writes are guarded by ownership (`worker_id` must
/// match `claimed_by`) and are idempotent so a retried report cannot corrupt
/// state.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Atomically claim the next pending job for `worker_id`, optionally
    /// restricted to `job_types`. Returns `None` when the pool is empty —
    /// that is a normal outcome, not an error.
    async fn claim_next_render_job(
        &self,
        worker_id: &str,
        job_types: Option<&[JobKind]>,
    ) -> StoreResult<Option<RenderJob>>;

    /// Insert a new job as `pending`.
    async fn enqueue(&self, job: NewRenderJob) -> StoreResult<RenderJob>;

    /// Fetch a job by ID.
    async fn get(&self, id: &JobId) -> StoreResult<Option<RenderJob>>;

    /// Record success for a job held by `worker_id`.
    async fn complete_job(
        &self,
        id: &JobId,
        worker_id: &str,
        result: RenderResult,
    ) -> StoreResult<()>;

    /// Record failure for a job held by `worker_id`.
    async fn fail_job(&self, id: &JobId, worker_id: &str, error: JobError) -> StoreResult<()>;

    /// Administrative reset of a failed job back to `pending`.
    async fn retry_job(&self, id: &JobId) -> StoreResult<RenderJob>;

    /// Fail every job stuck in `claimed` longer than `older_than`.
    /// Returns the recovered jobs. Used by the stale-claim reaper only.
    async fn fail_stale_claims(&self, older_than: Duration) -> StoreResult<Vec<RenderJob>>;

    /// Per-status totals.
    async fn counts(&self) -> StoreResult<JobCounts>;

    /// Connectivity probe, used by readiness checks.
    async fn check_connectivity(&self) -> StoreResult<()>;
}
