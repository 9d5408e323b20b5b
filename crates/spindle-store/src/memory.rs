//! In-memory job store.
//!
//! Honors the same contract as the PostgreSQL store: atomic claims, guarded
//! idempotent terminal writes, forward-only status. Used by unit tests and
//! as the fake behind API/worker tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use spindle_models::{
    FailureKind, JobCounts, JobError, JobId, JobKind, JobStatus, NewRenderJob, RenderJob,
    RenderResult,
};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

/// Mutex-protected job pool in insertion order.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<RenderJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every job, for test assertions.
    pub fn snapshot(&self) -> Vec<RenderJob> {
        self.jobs.lock().expect("job pool lock poisoned").clone()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn claim_next_render_job(
        &self,
        worker_id: &str,
        job_types: Option<&[JobKind]>,
    ) -> StoreResult<Option<RenderJob>> {
        let mut jobs = self.jobs.lock().expect("job pool lock poisoned");
        let next = jobs.iter_mut().find(|job| {
            job.status == JobStatus::Pending
                && job_types.map_or(true, |kinds| kinds.contains(&job.kind))
        });

        match next {
            Some(job) => {
                job.claim(worker_id);
                Ok(Some(job.clone()))
            }
            None => Ok(None),
        }
    }

    async fn enqueue(&self, job: NewRenderJob) -> StoreResult<RenderJob> {
        let job = job.into_job();
        let mut jobs = self.jobs.lock().expect("job pool lock poisoned");
        jobs.push(job.clone());
        Ok(job)
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<RenderJob>> {
        let jobs = self.jobs.lock().expect("job pool lock poisoned");
        Ok(jobs.iter().find(|job| &job.id == id).cloned())
    }

    async fn complete_job(
        &self,
        id: &JobId,
        worker_id: &str,
        result: RenderResult,
    ) -> StoreResult<()> {
        let mut jobs = self.jobs.lock().expect("job pool lock poisoned");
        let job = jobs
            .iter_mut()
            .find(|job| &job.id == id)
            .ok_or_else(|| StoreError::not_found(id.to_string()))?;

        if job.claimed_by.as_deref() != Some(worker_id) {
            return Err(StoreError::conflict(format!(
                "job {id} is not held by worker {worker_id}"
            )));
        }
        match job.status {
            JobStatus::Claimed => {
                job.complete(result);
                Ok(())
            }
            // Retried report of the same terminal outcome.
            JobStatus::Completed => Ok(()),
            other => Err(StoreError::conflict(format!(
                "job {id} is {other}, cannot complete"
            ))),
        }
    }

    async fn fail_job(&self, id: &JobId, worker_id: &str, error: JobError) -> StoreResult<()> {
        let mut jobs = self.jobs.lock().expect("job pool lock poisoned");
        let job = jobs
            .iter_mut()
            .find(|job| &job.id == id)
            .ok_or_else(|| StoreError::not_found(id.to_string()))?;

        if job.claimed_by.as_deref() != Some(worker_id) {
            return Err(StoreError::conflict(format!(
                "job {id} is not held by worker {worker_id}"
            )));
        }
        match job.status {
            JobStatus::Claimed => {
                job.fail(error);
                Ok(())
            }
            // Retried report: overwrite with identical terminal data.
            JobStatus::Failed => {
                job.error = Some(error);
                Ok(())
            }
            other => Err(StoreError::conflict(format!(
                "job {id} is {other}, cannot fail"
            ))),
        }
    }

    async fn retry_job(&self, id: &JobId) -> StoreResult<RenderJob> {
        let mut jobs = self.jobs.lock().expect("job pool lock poisoned");
        let job = jobs
            .iter_mut()
            .find(|job| &job.id == id)
            .ok_or_else(|| StoreError::not_found(id.to_string()))?;

        if job.status != JobStatus::Failed {
            return Err(StoreError::conflict(format!(
                "job {id} is {}, only failed jobs can be retried",
                job.status
            )));
        }
        job.reset_for_retry();
        Ok(job.clone())
    }

    async fn fail_stale_claims(&self, older_than: Duration) -> StoreResult<Vec<RenderJob>> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than)
                .map_err(|e| StoreError::unavailable(e.to_string()))?;

        let mut jobs = self.jobs.lock().expect("job pool lock poisoned");
        let mut recovered = Vec::new();
        for job in jobs.iter_mut() {
            if job.status == JobStatus::Claimed && job.claimed_at.is_some_and(|at| at < cutoff) {
                job.fail(JobError::new(
                    FailureKind::StaleClaim,
                    "claim went stale: worker stopped responding before a terminal report",
                ));
                recovered.push(job.clone());
            }
        }
        Ok(recovered)
    }

    async fn counts(&self) -> StoreResult<JobCounts> {
        let jobs = self.jobs.lock().expect("job pool lock poisoned");
        let mut counts = JobCounts::default();
        for job in jobs.iter() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Claimed => counts.claimed += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }

    async fn check_connectivity(&self) -> StoreResult<()> {
        Ok(())
    }
}
