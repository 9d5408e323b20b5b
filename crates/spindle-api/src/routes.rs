//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    claim_job, complete_job, enqueue_job, fail_job, get_render_job, health, queue_status, ready,
    retry_job,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Worker protocol: claim plus the two terminal reports.
    let worker_routes = Router::new()
        .route("/worker/claim", post(claim_job))
        .route("/worker/jobs/:job_id/complete", post(complete_job))
        .route("/worker/jobs/:job_id/fail", post(fail_job));

    // App-backend surface: enqueue and readback.
    let job_routes = Router::new()
        .route("/render-jobs", post(enqueue_job))
        .route("/render-jobs/:job_id", get(get_render_job));

    // Operator surface: explicit retry and queue inspection.
    let admin_routes = Router::new()
        .route("/admin/jobs/:job_id/retry", post(retry_job))
        .route("/admin/queue/status", get(queue_status));

    let api_routes = Router::new()
        .merge(worker_routes)
        .merge(job_routes)
        .merge(admin_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .with_state(state)
}
