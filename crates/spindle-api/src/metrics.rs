//! Prometheus metrics for the control API.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "spindle_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "spindle_http_request_duration_seconds";

    pub const CLAIMS_TOTAL: &str = "spindle_claims_total";
    pub const JOBS_ENQUEUED_TOTAL: &str = "spindle_jobs_enqueued_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "spindle_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "spindle_jobs_failed_total";
    pub const STALE_CLAIMS_RECOVERED_TOTAL: &str = "spindle_stale_claims_recovered_total";
}

/// Record a claim call. `outcome` is one of `job`, `empty`, `unavailable`.
pub fn record_claim(outcome: &'static str) {
    counter!(names::CLAIMS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a job enqueued.
pub fn record_job_enqueued(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::JOBS_ENQUEUED_TOTAL, &labels).increment(1);
}

/// Record a job completed.
pub fn record_job_completed(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record a job failed.
pub fn record_job_failed(kind: &str, failure: &str) {
    let labels = [("kind", kind.to_string()), ("failure", failure.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record stale claims recovered by the reaper.
pub fn record_stale_claims_recovered(count: u64) {
    counter!(names::STALE_CLAIMS_RECOVERED_TOTAL).increment(count);
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let labels = [
        ("method", method),
        ("status", response.status().as_u16().to_string()),
    ];
    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(start.elapsed().as_secs_f64());

    response
}
