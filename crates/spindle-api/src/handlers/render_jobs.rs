//! Enqueue and readback handlers, called by the app backend.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use spindle_models::{JobKind, JobPayload, NewRenderJob, RenderJob};

use crate::auth::AdminAuth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::worker::parse_job_id;
use crate::metrics;
use crate::state::AppState;

/// Enqueue request body.
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub kind: JobKind,
    pub payload: serde_json::Value,
}

/// Response carrying a single job record.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub ok: bool,
    pub job: RenderJob,
}

/// POST /api/render-jobs
///
/// Validate the payload against its kind and insert the job as `pending`.
pub async fn enqueue_job(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(req): Json<EnqueueRequest>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    JobPayload::decode(req.kind, &req.payload)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let job = state
        .store
        .enqueue(NewRenderJob::new(req.kind, req.payload))
        .await?;

    metrics::record_job_enqueued(job.kind.as_str());
    info!(job_id = %job.id, kind = %job.kind, "Render job enqueued");

    Ok((StatusCode::CREATED, Json(JobResponse { ok: true, job })))
}

/// GET /api/render-jobs/:job_id
pub async fn get_render_job(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let id = parse_job_id(&job_id)?;
    let job = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {job_id} not found")))?;
    Ok(Json(JobResponse { ok: true, job }))
}
