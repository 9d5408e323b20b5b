//! Control API client.
//!
//! The worker talks to the job pool exclusively through these three calls:
//! claim, complete, fail. The trait exists so the loop can be exercised
//! against an in-memory store in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use spindle_models::{JobError, JobId, JobKind, RenderJob, RenderResult};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

const WORKER_TOKEN_HEADER: &str = "X-Worker-Token";

/// The three writes of the worker protocol.
#[async_trait]
pub trait JobControl: Send + Sync {
    /// Claim at most one job. `None` means the pool is empty.
    async fn claim(
        &self,
        worker_id: &str,
        job_types: Option<&[JobKind]>,
    ) -> WorkerResult<Option<RenderJob>>;

    /// Report terminal success for a held job.
    async fn complete(
        &self,
        job_id: &JobId,
        worker_id: &str,
        result: RenderResult,
    ) -> WorkerResult<()>;

    /// Report terminal failure for a held job.
    async fn fail(&self, job_id: &JobId, worker_id: &str, error: JobError) -> WorkerResult<()>;
}

#[derive(Serialize)]
struct ClaimRequestBody<'a> {
    worker_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_types: Option<&'a [JobKind]>,
}

#[derive(Deserialize)]
struct ClaimResponseBody {
    job: Option<RenderJob>,
}

#[derive(Serialize)]
struct CompleteRequestBody<'a> {
    worker_id: &'a str,
    result: RenderResult,
}

#[derive(Serialize)]
struct FailRequestBody<'a> {
    worker_id: &'a str,
    error: JobError,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the control API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    worker_token: String,
}

impl ApiClient {
    /// Create a client from worker configuration.
    pub fn new(config: &WorkerConfig) -> WorkerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WorkerError::config_error(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            worker_token: config.worker_token.clone(),
        })
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => format!("HTTP {status}: {}", body.error),
            Err(_) => format!("HTTP {status}"),
        }
    }
}

#[async_trait]
impl JobControl for ApiClient {
    async fn claim(
        &self,
        worker_id: &str,
        job_types: Option<&[JobKind]>,
    ) -> WorkerResult<Option<RenderJob>> {
        let url = format!("{}/api/worker/claim", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(WORKER_TOKEN_HEADER, &self.worker_token)
            .json(&ClaimRequestBody {
                worker_id,
                job_types,
            })
            .send()
            .await
            .map_err(|e| WorkerError::ClaimUnavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(WorkerError::Unauthorized(Self::error_message(response).await));
        }
        if !status.is_success() {
            return Err(WorkerError::ClaimUnavailable(
                Self::error_message(response).await,
            ));
        }

        let body: ClaimResponseBody = response
            .json()
            .await
            .map_err(|e| WorkerError::ClaimUnavailable(format!("malformed claim response: {e}")))?;
        Ok(body.job)
    }

    async fn complete(
        &self,
        job_id: &JobId,
        worker_id: &str,
        result: RenderResult,
    ) -> WorkerResult<()> {
        let url = format!("{}/api/worker/jobs/{}/complete", self.base_url, job_id);
        let response = self
            .http
            .post(&url)
            .header(WORKER_TOKEN_HEADER, &self.worker_token)
            .json(&CompleteRequestBody { worker_id, result })
            .send()
            .await
            .map_err(|e| WorkerError::ReportFailed(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(WorkerError::ReportFailed(Self::error_message(response).await))
        }
    }

    async fn fail(&self, job_id: &JobId, worker_id: &str, error: JobError) -> WorkerResult<()> {
        let url = format!("{}/api/worker/jobs/{}/fail", self.base_url, job_id);
        let response = self
            .http
            .post(&url)
            .header(WORKER_TOKEN_HEADER, &self.worker_token)
            .json(&FailRequestBody { worker_id, error })
            .send()
            .await
            .map_err(|e| WorkerError::ReportFailed(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(WorkerError::ReportFailed(Self::error_message(response).await))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> WorkerConfig {
        WorkerConfig {
            api_base_url: base_url,
            worker_token: "worker-secret".into(),
            worker_id: "w1".into(),
            poll_interval: Duration::from_secs(5),
            job_types: None,
            render_timeout: Duration::from_secs(600),
            work_dir: "/tmp/spindle".into(),
        }
    }

    #[tokio::test]
    async fn test_claim_parses_job_and_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/worker/claim"))
            .and(header("X-Worker-Token", "worker-secret"))
            .and(body_partial_json(json!({ "worker_id": "w1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "job": null
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&test_config(server.uri())).unwrap();
        let job = client.claim("w1", None).await.unwrap();
        assert!(job.is_none());
    }

    #[tokio::test]
    async fn test_claim_maps_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/worker/claim"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false,
                "error": "Unauthorized: invalid worker token"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&test_config(server.uri())).unwrap();
        let err = client.claim("w1", None).await.unwrap_err();
        assert!(matches!(err, WorkerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_claim_maps_store_outage_to_claim_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/worker/claim"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "ok": false,
                "error": "Job store unavailable: connection refused"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&test_config(server.uri())).unwrap();
        let err = client.claim("w1", None).await.unwrap_err();
        assert!(matches!(err, WorkerError::ClaimUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fail_report_round_trip() {
        let server = MockServer::start().await;
        let job_id = JobId::new();
        Mock::given(method("POST"))
            .and(path(format!("/api/worker/jobs/{job_id}/fail")))
            .and(body_partial_json(json!({
                "worker_id": "w1",
                "error": { "kind": "render", "message": "ffmpeg exited 1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&test_config(server.uri())).unwrap();
        client
            .fail(
                &job_id,
                "w1",
                JobError::new(spindle_models::FailureKind::Render, "ffmpeg exited 1"),
            )
            .await
            .unwrap();
    }
}
