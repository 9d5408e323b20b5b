//! Admin handlers: retry and queue inspection.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use spindle_models::JobCounts;

use crate::auth::AdminAuth;
use crate::error::ApiResult;
use crate::handlers::render_jobs::JobResponse;
use crate::handlers::worker::parse_job_id;
use crate::state::AppState;

/// POST /api/admin/jobs/:job_id/retry
///
/// The explicit administrative `failed -> pending` reset. This is the only
/// way a failed job re-enters the pool; workers never retry on their own.
pub async fn retry_job(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let id = parse_job_id(&job_id)?;
    let job = state.store.retry_job(&id).await?;
    info!(job_id = %job.id, attempts = job.attempts, "Job reset to pending by admin");
    Ok(Json(JobResponse { ok: true, job }))
}

/// Queue status response.
#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
    pub ok: bool,
    pub counts: JobCounts,
}

/// GET /api/admin/queue/status
pub async fn queue_status(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> ApiResult<Json<QueueStatusResponse>> {
    let counts = state.store.counts().await?;
    Ok(Json(QueueStatusResponse { ok: true, counts }))
}
