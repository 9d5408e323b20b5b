//! Worker loop tests against the in-memory job store.
//!
//! These exercise the loop's terminal-report guarantee: every claimed job
//! ends `completed` or `failed` — on success, handler error, handler panic,
//! and execution timeout — and no failure mode stops the loop from polling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use spindle_models::{
    FailureKind, JobError, JobId, JobKind, JobStatus, NewRenderJob, RenderJob, RenderResult,
};
use spindle_store::{JobStore, MemoryJobStore};
use spindle_worker::executor::PollOutcome;
use spindle_worker::{JobControl, JobRunner, WorkerConfig, WorkerError, WorkerLoop};

/// Control plane backed directly by the in-memory store.
struct StoreControl {
    store: Arc<MemoryJobStore>,
}

#[async_trait]
impl JobControl for StoreControl {
    async fn claim(
        &self,
        worker_id: &str,
        job_types: Option<&[JobKind]>,
    ) -> Result<Option<RenderJob>, WorkerError> {
        self.store
            .claim_next_render_job(worker_id, job_types)
            .await
            .map_err(|e| WorkerError::ClaimUnavailable(e.to_string()))
    }

    async fn complete(
        &self,
        job_id: &JobId,
        worker_id: &str,
        result: RenderResult,
    ) -> Result<(), WorkerError> {
        self.store
            .complete_job(job_id, worker_id, result)
            .await
            .map_err(|e| WorkerError::ReportFailed(e.to_string()))
    }

    async fn fail(
        &self,
        job_id: &JobId,
        worker_id: &str,
        error: JobError,
    ) -> Result<(), WorkerError> {
        self.store
            .fail_job(job_id, worker_id, error)
            .await
            .map_err(|e| WorkerError::ReportFailed(e.to_string()))
    }
}

/// Runner scripted by job kind: posters succeed, gifs fail, artwork panics.
struct ScriptedRunner;

#[async_trait]
impl JobRunner for ScriptedRunner {
    async fn render(&self, job: &RenderJob) -> Result<RenderResult, WorkerError> {
        match job.kind {
            JobKind::Poster => Ok(RenderResult {
                artifact_url: format!("https://cdn.example.com/posters/{}.jpg", job.id),
                content_type: "image/jpeg".into(),
                size_bytes: Some(2048),
            }),
            JobKind::Gif => Err(WorkerError::execution(
                FailureKind::Render,
                "ffmpeg exited with status 1",
            )),
            JobKind::Artwork => panic!("renderer blew up"),
        }
    }
}

/// Runner that never finishes within the test timeout.
struct SlowRunner;

#[async_trait]
impl JobRunner for SlowRunner {
    async fn render(&self, _job: &RenderJob) -> Result<RenderResult, WorkerError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        unreachable!("execution should have been cut off by the timeout");
    }
}

fn test_config(render_timeout: Duration) -> WorkerConfig {
    WorkerConfig {
        api_base_url: "http://unused".into(),
        worker_token: "unused".into(),
        worker_id: "w-test".into(),
        poll_interval: Duration::from_millis(10),
        job_types: None,
        render_timeout,
        work_dir: "/tmp/spindle-test".into(),
    }
}

fn payload(kind: JobKind) -> serde_json::Value {
    match kind {
        JobKind::Poster => serde_json::json!({ "cover_urls": ["https://cdn.example.com/a.jpg"] }),
        JobKind::Gif => serde_json::json!({
            "frame_urls": ["https://cdn.example.com/1.jpg", "https://cdn.example.com/2.jpg"]
        }),
        JobKind::Artwork => serde_json::json!({
            "event_id": "evt-1",
            "image_url": "https://cdn.example.com/art.png"
        }),
    }
}

async fn seed(store: &MemoryJobStore, kinds: &[JobKind]) -> Vec<RenderJob> {
    let mut jobs = Vec::new();
    for kind in kinds {
        jobs.push(
            store
                .enqueue(NewRenderJob::new(*kind, payload(*kind)))
                .await
                .unwrap(),
        );
    }
    jobs
}

fn worker_over(
    store: &Arc<MemoryJobStore>,
    runner: impl JobRunner + 'static,
    render_timeout: Duration,
) -> WorkerLoop<StoreControl, impl JobRunner + 'static> {
    WorkerLoop::new(
        test_config(render_timeout),
        StoreControl {
            store: Arc::clone(store),
        },
        runner,
    )
}

#[tokio::test]
async fn empty_pool_polls_idle() {
    let store = Arc::new(MemoryJobStore::new());
    let worker = worker_over(&store, ScriptedRunner, Duration::from_secs(5));
    assert_eq!(worker.poll_once().await, PollOutcome::Idle);
}

#[tokio::test]
async fn claimed_job_reaches_completed_with_artifact_url() {
    let store = Arc::new(MemoryJobStore::new());
    let jobs = seed(&store, &[JobKind::Poster]).await;
    let worker = worker_over(&store, ScriptedRunner, Duration::from_secs(5));

    assert_eq!(worker.poll_once().await, PollOutcome::Processed);

    let job = store.get(&jobs[0].id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    let result = job.result.unwrap();
    assert!(result.artifact_url.contains(&jobs[0].id.to_string()));
    assert_eq!(job.claimed_by.as_deref(), Some("w-test"));
}

#[tokio::test]
async fn render_failure_fails_the_job_and_the_loop_keeps_polling() {
    let store = Arc::new(MemoryJobStore::new());
    let jobs = seed(&store, &[JobKind::Gif, JobKind::Poster]).await;
    let worker = worker_over(&store, ScriptedRunner, Duration::from_secs(5));

    // The gif job fails with a recorded, non-empty error...
    assert_eq!(worker.poll_once().await, PollOutcome::Processed);
    let failed = store.get(&jobs[0].id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    let error = failed.error.unwrap();
    assert_eq!(error.kind, FailureKind::Render);
    assert!(!error.message.is_empty());

    // ...and the very next poll still claims and completes work.
    assert_eq!(worker.poll_once().await, PollOutcome::Processed);
    let completed = store.get(&jobs[1].id).await.unwrap().unwrap();
    assert_eq!(completed.status, JobStatus::Completed);
}

#[tokio::test]
async fn renderer_panic_still_yields_a_terminal_failure() {
    let store = Arc::new(MemoryJobStore::new());
    let jobs = seed(&store, &[JobKind::Artwork]).await;
    let worker = worker_over(&store, ScriptedRunner, Duration::from_secs(5));

    assert_eq!(worker.poll_once().await, PollOutcome::Processed);

    let job = store.get(&jobs[0].id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.kind, FailureKind::Internal);
    assert!(error.message.contains("panicked"));

    // Nothing is left claimed.
    assert_eq!(store.counts().await.unwrap().claimed, 0);
}

#[tokio::test]
async fn execution_timeout_fails_the_job() {
    let store = Arc::new(MemoryJobStore::new());
    let jobs = seed(&store, &[JobKind::Poster]).await;
    let worker = worker_over(&store, SlowRunner, Duration::from_millis(200));

    assert_eq!(worker.poll_once().await, PollOutcome::Processed);

    let job = store.get(&jobs[0].id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.unwrap().kind, FailureKind::Timeout);
}

#[tokio::test]
async fn claim_error_is_contained() {
    struct BrokenControl;

    #[async_trait]
    impl JobControl for BrokenControl {
        async fn claim(
            &self,
            _worker_id: &str,
            _job_types: Option<&[JobKind]>,
        ) -> Result<Option<RenderJob>, WorkerError> {
            Err(WorkerError::ClaimUnavailable("connection refused".into()))
        }

        async fn complete(
            &self,
            _job_id: &JobId,
            _worker_id: &str,
            _result: RenderResult,
        ) -> Result<(), WorkerError> {
            unreachable!("nothing is ever claimed")
        }

        async fn fail(
            &self,
            _job_id: &JobId,
            _worker_id: &str,
            _error: JobError,
        ) -> Result<(), WorkerError> {
            unreachable!("nothing is ever claimed")
        }
    }

    let worker = WorkerLoop::new(
        test_config(Duration::from_secs(5)),
        BrokenControl,
        ScriptedRunner,
    );
    // Transient claim failures are logged and absorbed, never panics.
    assert_eq!(worker.poll_once().await, PollOutcome::ClaimError);
    assert_eq!(worker.poll_once().await, PollOutcome::ClaimError);
}
