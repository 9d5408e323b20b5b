//! Background service for recovering stale claims.
//!
//! A worker crash leaves its job stuck in `claimed` forever — the worker
//! loop itself never detects this. This service runs periodically in the
//! API process, fails any claim older than the configured threshold, and
//! leaves the retry decision to an operator.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info, warn};

use spindle_store::{JobStore, StoreResult};

use crate::config::ApiConfig;
use crate::metrics;

/// Stale claim reaper service.
pub struct StaleClaimReaper {
    store: Arc<dyn JobStore>,
    sweep_interval: Duration,
    older_than: Duration,
    enabled: bool,
}

impl StaleClaimReaper {
    /// Create a new reaper from API configuration.
    pub fn new(store: Arc<dyn JobStore>, config: &ApiConfig) -> Self {
        Self {
            store,
            sweep_interval: config.stale_reaper_interval,
            older_than: config.stale_claim_after,
            enabled: config.stale_reaper_enabled,
        }
    }

    /// Start the detection loop.
    ///
    /// Runs indefinitely; spawn as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Stale claim reaper is disabled");
            return;
        }

        info!(
            interval_secs = self.sweep_interval.as_secs(),
            threshold_secs = self.older_than.as_secs(),
            "Starting stale claim reaper"
        );

        let mut ticker = interval(self.sweep_interval);

        loop {
            ticker.tick().await;

            if let Err(e) = self.sweep().await {
                error!("Stale claim sweep error: {}", e);
            }
        }
    }

    /// Run a single sweep. Also used directly by tests.
    pub async fn sweep(&self) -> StoreResult<u64> {
        let recovered = self.store.fail_stale_claims(self.older_than).await?;

        for job in &recovered {
            warn!(
                job_id = %job.id,
                kind = %job.kind,
                claimed_by = job.claimed_by.as_deref().unwrap_or("unknown"),
                claimed_at = ?job.claimed_at,
                attempts = job.attempts,
                "Recovered stale claim: job marked failed"
            );
        }

        let count = recovered.len() as u64;
        if count > 0 {
            metrics::record_stale_claims_recovered(count);
            info!("Stale claim sweep complete: {} recovered", count);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_models::{JobKind, JobStatus, NewRenderJob};
    use spindle_store::MemoryJobStore;

    fn test_config(older_than: Duration) -> ApiConfig {
        ApiConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "postgres://unused".into(),
            worker_token: "wt".into(),
            admin_token: "at".into(),
            max_body_size: 1024,
            stale_reaper_enabled: true,
            stale_reaper_interval: Duration::from_secs(60),
            stale_claim_after: older_than,
        }
    }

    #[tokio::test]
    async fn sweep_fails_only_overdue_claims() {
        let store = Arc::new(MemoryJobStore::new());
        let payload = serde_json::json!({ "cover_urls": ["https://cdn.example.com/a.jpg"] });

        let claimed = store
            .enqueue(NewRenderJob::new(JobKind::Poster, payload.clone()))
            .await
            .unwrap();
        store
            .enqueue(NewRenderJob::new(JobKind::Poster, payload))
            .await
            .unwrap();
        store
            .claim_next_render_job("w1", None)
            .await
            .unwrap()
            .unwrap();

        // Threshold zero: any existing claim is overdue.
        let reaper = StaleClaimReaper::new(
            Arc::clone(&store) as Arc<dyn JobStore>,
            &test_config(Duration::ZERO),
        );
        let recovered = reaper.sweep().await.unwrap();
        assert_eq!(recovered, 1);

        let job = store.get(&claimed.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.failed, 1);

        // Second sweep finds nothing: failed jobs are terminal.
        assert_eq!(reaper.sweep().await.unwrap(), 0);
    }
}
