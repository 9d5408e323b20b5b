//! PostgreSQL job store.
//!
//! The claim delegates to the `claim_next_render_job(worker_id, job_types)`
//! stored procedure (see `migrations/0001_render_jobs.sql`), which takes the
//! row lock with `FOR UPDATE SKIP LOCKED` in a single statement. Application
//! code never does read-then-write claiming.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use spindle_models::{
    FailureKind, JobCounts, JobError, JobId, JobKind, JobStatus, NewRenderJob, RenderJob,
    RenderResult,
};

use crate::error::{StoreError, StoreResult};
use crate::store::JobStore;

/// Wire mapping for the `render_job_status` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "render_job_status", rename_all = "snake_case")]
enum PgJobStatus {
    Pending,
    Claimed,
    Completed,
    Failed,
}

impl From<PgJobStatus> for JobStatus {
    fn from(status: PgJobStatus) -> Self {
        match status {
            PgJobStatus::Pending => JobStatus::Pending,
            PgJobStatus::Claimed => JobStatus::Claimed,
            PgJobStatus::Completed => JobStatus::Completed,
            PgJobStatus::Failed => JobStatus::Failed,
        }
    }
}

/// Row shape of the `render_jobs` table.
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: uuid::Uuid,
    kind: String,
    status: PgJobStatus,
    payload: serde_json::Value,
    claimed_by: Option<String>,
    claimed_at: Option<DateTime<Utc>>,
    attempts: i32,
    result: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn into_job(self) -> StoreResult<RenderJob> {
        let kind: JobKind = serde_json::from_value(serde_json::Value::String(self.kind))?;
        let result: Option<RenderResult> = self.result.map(serde_json::from_value).transpose()?;
        let error: Option<JobError> = self.error.map(serde_json::from_value).transpose()?;

        Ok(RenderJob {
            id: JobId(self.id),
            kind,
            status: self.status.into(),
            payload: self.payload,
            claimed_by: self.claimed_by,
            claimed_at: self.claimed_at,
            attempts: self.attempts,
            result,
            error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Job store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create from an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))?;
        info!("Job store migrations applied");
        Ok(())
    }

    /// Classify a zero-row guarded update: missing job vs. rejected guard.
    async fn guard_violation(&self, id: &JobId, action: &str) -> StoreError {
        match self.get(id).await {
            Ok(Some(job)) => StoreError::conflict(format!(
                "job {id} is {} and not eligible to {action}",
                job.status
            )),
            Ok(None) => StoreError::not_found(id.to_string()),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn claim_next_render_job(
        &self,
        worker_id: &str,
        job_types: Option<&[JobKind]>,
    ) -> StoreResult<Option<RenderJob>> {
        let kinds: Option<Vec<String>> =
            job_types.map(|kinds| kinds.iter().map(|k| k.as_str().to_string()).collect());

        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM claim_next_render_job($1, $2)")
            .bind(worker_id)
            .bind(kinds)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let job = row.into_job()?;
                debug!(job_id = %job.id, kind = %job.kind, worker_id, "Claimed render job");
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn enqueue(&self, job: NewRenderJob) -> StoreResult<RenderJob> {
        let row = sqlx::query_as::<_, JobRow>(
            "INSERT INTO render_jobs (id, kind, payload) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(job.kind.as_str())
        .bind(job.payload)
        .fetch_one(&self.pool)
        .await?;

        let job = row.into_job()?;
        info!(job_id = %job.id, kind = %job.kind, "Enqueued render job");
        Ok(job)
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<RenderJob>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM render_jobs WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(JobRow::into_job).transpose()
    }

    async fn complete_job(
        &self,
        id: &JobId,
        worker_id: &str,
        result: RenderResult,
    ) -> StoreResult<()> {
        // Re-reporting an already-completed job overwrites the result with
        // identical terminal data; any other state is a guard violation.
        let updated = sqlx::query(
            "UPDATE render_jobs \
                SET status = 'completed', result = $3, updated_at = now() \
              WHERE id = $1 AND claimed_by = $2 \
                AND status IN ('claimed', 'completed')",
        )
        .bind(*id.as_uuid())
        .bind(worker_id)
        .bind(serde_json::to_value(&result)?)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(self.guard_violation(id, "complete").await);
        }
        info!(job_id = %id, worker_id, "Render job completed");
        Ok(())
    }

    async fn fail_job(&self, id: &JobId, worker_id: &str, error: JobError) -> StoreResult<()> {
        let updated = sqlx::query(
            "UPDATE render_jobs \
                SET status = 'failed', error = $3, updated_at = now() \
              WHERE id = $1 AND claimed_by = $2 \
                AND status IN ('claimed', 'failed')",
        )
        .bind(*id.as_uuid())
        .bind(worker_id)
        .bind(serde_json::to_value(&error)?)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(self.guard_violation(id, "fail").await);
        }
        info!(job_id = %id, worker_id, kind = %error.kind, "Render job failed");
        Ok(())
    }

    async fn retry_job(&self, id: &JobId) -> StoreResult<RenderJob> {
        let row = sqlx::query_as::<_, JobRow>(
            "UPDATE render_jobs \
                SET status = 'pending', claimed_by = NULL, claimed_at = NULL, \
                    error = NULL, updated_at = now() \
              WHERE id = $1 AND status = 'failed' \
          RETURNING *",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let job = row.into_job()?;
                info!(job_id = %job.id, "Render job reset to pending for retry");
                Ok(job)
            }
            None => Err(self.guard_violation(id, "retry").await),
        }
    }

    async fn fail_stale_claims(&self, older_than: Duration) -> StoreResult<Vec<RenderJob>> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than)
                .map_err(|e| StoreError::unavailable(e.to_string()))?;
        let error = JobError::new(
            FailureKind::StaleClaim,
            "claim went stale: worker stopped responding before a terminal report",
        );

        let rows = sqlx::query_as::<_, JobRow>(
            "UPDATE render_jobs \
                SET status = 'failed', error = $2, updated_at = now() \
              WHERE status = 'claimed' AND claimed_at < $1 \
          RETURNING *",
        )
        .bind(cutoff)
        .bind(serde_json::to_value(&error)?)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn counts(&self) -> StoreResult<JobCounts> {
        let rows = sqlx::query_as::<_, (PgJobStatus, i64)>(
            "SELECT status, COUNT(*) FROM render_jobs GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = JobCounts::default();
        for (status, count) in rows {
            let count = count as u64;
            match status {
                PgJobStatus::Pending => counts.pending = count,
                PgJobStatus::Claimed => counts.claimed = count,
                PgJobStatus::Completed => counts.completed = count,
                PgJobStatus::Failed => counts.failed = count,
            }
        }
        Ok(counts)
    }

    async fn check_connectivity(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
