//! Worker configuration.

use std::time::Duration;

use uuid::Uuid;

use spindle_models::JobKind;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the control API
    pub api_base_url: String,
    /// Pre-shared worker credential
    pub worker_token: String,
    /// Identifier of this worker instance
    pub worker_id: String,
    /// Fixed delay between claim polls
    pub poll_interval: Duration,
    /// Optional job kind filter for claims
    pub job_types: Option<Vec<JobKind>>,
    /// Bounded execution time for one job (download + render + upload)
    pub render_timeout: Duration,
    /// Work directory for temporary files
    pub work_dir: String,
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Missing required values are fatal at startup; per-job failures never
    /// are.
    pub fn from_env() -> WorkerResult<Self> {
        let api_base_url = std::env::var("API_BASE_URL")
            .map_err(|_| WorkerError::config_error("API_BASE_URL not set"))?
            .trim_end_matches('/')
            .to_string();
        let worker_token = std::env::var("WORKER_TOKEN")
            .map_err(|_| WorkerError::config_error("WORKER_TOKEN not set"))?;

        let job_types = match std::env::var("WORKER_JOB_TYPES") {
            Ok(raw) if !raw.trim().is_empty() => {
                let kinds = raw
                    .split(',')
                    .map(|s| s.trim().parse::<JobKind>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(WorkerError::config_error)?;
                Some(kinds)
            }
            _ => None,
        };

        // The loop processes strictly one job in flight; the knob exists so
        // a misconfigured deployment fails loudly instead of silently
        // degrading to sequential behavior.
        let max_jobs: usize = std::env::var("WORKER_MAX_JOBS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        if max_jobs != 1 {
            return Err(WorkerError::config_error(format!(
                "WORKER_MAX_JOBS={max_jobs} is unsupported: this worker processes one job at a time"
            )));
        }

        Ok(Self {
            api_base_url,
            worker_token,
            worker_id: std::env::var("WORKER_ID")
                .unwrap_or_else(|_| format!("render-worker-{}", Uuid::new_v4())),
            poll_interval: Duration::from_secs(
                std::env::var("WORKER_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            job_types,
            render_timeout: Duration::from_secs(
                std::env::var("WORKER_RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/spindle".to_string()),
        })
    }
}
