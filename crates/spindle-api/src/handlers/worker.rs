//! Worker-facing handlers: claim and terminal reports.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use spindle_models::{JobError, JobId, JobKind, RenderJob, RenderResult};

use crate::auth::WorkerAuth;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Claim request body.
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    /// Identifier of the calling worker instance
    pub worker_id: String,
    /// Optional job kind filter
    #[serde(default)]
    pub job_types: Option<Vec<JobKind>>,
}

/// Claim response body. `job` is `null` when the pool is empty — that is a
/// normal outcome, not an error.
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub ok: bool,
    pub job: Option<RenderJob>,
}

/// Terminal success report body.
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub worker_id: String,
    pub result: RenderResult,
}

/// Terminal failure report body.
#[derive(Debug, Deserialize)]
pub struct FailRequest {
    pub worker_id: String,
    pub error: JobError,
}

/// Acknowledgement body for terminal reports.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub ok: bool,
}

/// POST /api/worker/claim
///
/// Hand the calling worker at most one job, atomically removing it from the
/// pool visible to other workers. Delegates to the store's
/// `claim_next_render_job(worker_id, job_types)` primitive; exclusivity is
/// enforced there, not here.
pub async fn claim_job(
    State(state): State<AppState>,
    _auth: WorkerAuth,
    Json(req): Json<ClaimRequest>,
) -> ApiResult<Json<ClaimResponse>> {
    if req.worker_id.trim().is_empty() {
        return Err(ApiError::bad_request("worker_id must not be empty"));
    }

    let job = state
        .store
        .claim_next_render_job(&req.worker_id, req.job_types.as_deref())
        .await
        .map_err(|e| {
            metrics::record_claim("unavailable");
            ApiError::from(e)
        })?;

    match &job {
        Some(job) => {
            metrics::record_claim("job");
            info!(
                job_id = %job.id,
                kind = %job.kind,
                worker_id = %req.worker_id,
                attempts = job.attempts,
                "Job claimed"
            );
        }
        None => metrics::record_claim("empty"),
    }

    Ok(Json(ClaimResponse { ok: true, job }))
}

/// POST /api/worker/jobs/:job_id/complete
///
/// Record the terminal success of a claimed job. Idempotent for the owning
/// worker: re-reporting an already-completed job is accepted.
pub async fn complete_job(
    State(state): State<AppState>,
    _auth: WorkerAuth,
    Path(job_id): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> ApiResult<Json<AckResponse>> {
    let id = parse_job_id(&job_id)?;

    state
        .store
        .complete_job(&id, &req.worker_id, req.result)
        .await?;

    if let Ok(Some(job)) = state.store.get(&id).await {
        metrics::record_job_completed(job.kind.as_str());
    }
    Ok(Json(AckResponse { ok: true }))
}

/// POST /api/worker/jobs/:job_id/fail
///
/// Record the terminal failure of a claimed job. Idempotent for the owning
/// worker.
pub async fn fail_job(
    State(state): State<AppState>,
    _auth: WorkerAuth,
    Path(job_id): Path<String>,
    Json(req): Json<FailRequest>,
) -> ApiResult<Json<AckResponse>> {
    let id = parse_job_id(&job_id)?;
    if req.error.message.trim().is_empty() {
        return Err(ApiError::bad_request("error message must not be empty"));
    }

    let failure = req.error.kind;
    state.store.fail_job(&id, &req.worker_id, req.error).await?;

    if let Ok(Some(job)) = state.store.get(&id).await {
        metrics::record_job_failed(job.kind.as_str(), failure.as_str());
    }
    Ok(Json(AckResponse { ok: true }))
}

pub(crate) fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid job id: {raw}")))
}
