//! The worker loop.
//!
//! One job in flight, always. The loop ticks on a fixed interval, claims at
//! most one job, executes it under a bounded timeout, and writes exactly one
//! terminal report for every claimed job — on success, on handler error, on
//! timeout, and on handler panic alike. Per-job failures never terminate the
//! process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use spindle_models::{FailureKind, JobError, RenderJob, RenderResult};

use crate::client::JobControl;
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::logging::JobLogger;
use crate::render::JobRunner;

/// Attempts for each terminal report before giving up and leaving the job
/// to the stale-claim reaper.
const REPORT_ATTEMPTS: u32 = 3;

/// Backoff between report attempts.
const REPORT_BACKOFF: Duration = Duration::from_secs(2);

/// Outcome of one poll tick.
#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Pool was empty
    Idle,
    /// A job was claimed and driven to a terminal report
    Processed,
    /// The claim itself failed (transient)
    ClaimError,
}

/// Single-job-in-flight worker loop.
pub struct WorkerLoop<C, R> {
    config: WorkerConfig,
    control: Arc<C>,
    runner: Arc<R>,
    shutdown: watch::Sender<bool>,
}

impl<C, R> WorkerLoop<C, R>
where
    C: JobControl + 'static,
    R: JobRunner + 'static,
{
    /// Create a new worker loop.
    pub fn new(config: WorkerConfig, control: C, runner: R) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            control: Arc::new(control),
            runner: Arc::new(runner),
            shutdown,
        }
    }

    /// Signal shutdown; the loop exits after the current job (if any).
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Run until shutdown.
    pub async fn run(&self) {
        info!(
            worker_id = %self.config.worker_id,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            job_types = ?self.config.job_types,
            "Starting worker loop"
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping worker loop");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }

        info!("Worker loop stopped");
    }

    /// One tick: claim at most one job and drive it to a terminal report.
    pub async fn poll_once(&self) -> PollOutcome {
        let claimed = self
            .control
            .claim(&self.config.worker_id, self.config.job_types.as_deref())
            .await;

        match claimed {
            Ok(Some(job)) => {
                self.process(job).await;
                PollOutcome::Processed
            }
            Ok(None) => PollOutcome::Idle,
            Err(WorkerError::Unauthorized(msg)) => {
                // Likely a credential rotation problem; worth a loud log,
                // but the loop keeps polling rather than crashing.
                error!("Claim rejected: {}", msg);
                PollOutcome::ClaimError
            }
            Err(e) => {
                warn!("Claim failed: {}", e);
                PollOutcome::ClaimError
            }
        }
    }

    /// Execute one claimed job. Always ends in exactly one terminal report.
    async fn process(&self, job: RenderJob) {
        let logger = JobLogger::new(&job.id, &format!("render_{}", job.kind));
        logger.log_start(&format!("attempt {} as {}", job.attempts, self.config.worker_id));

        let runner = Arc::clone(&self.runner);
        let job_for_task = job.clone();
        let mut handle = tokio::spawn(async move { runner.render(&job_for_task).await });

        let outcome: Result<RenderResult, JobError> = tokio::select! {
            joined = &mut handle => match joined {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(e.to_job_error()),
                // Panic in a renderer is harvested here, not propagated.
                Err(join_err) => Err(JobError::new(
                    FailureKind::Internal,
                    format!("render task panicked: {join_err}"),
                )),
            },
            _ = tokio::time::sleep(self.config.render_timeout) => {
                handle.abort();
                Err(JobError::new(
                    FailureKind::Timeout,
                    format!(
                        "render exceeded the {}s execution timeout",
                        self.config.render_timeout.as_secs()
                    ),
                ))
            }
        };

        match &outcome {
            Ok(result) => logger.log_completion(&result.artifact_url),
            Err(error) => logger.log_error(&format!("{}: {}", error.kind, error.message)),
        }

        self.report_terminal(&job, outcome).await;
    }

    /// Write the terminal status, retrying a few times. If every attempt
    /// fails the job stays `claimed` and the reaper recovers it later; the
    /// loop must never block on a report forever.
    async fn report_terminal(&self, job: &RenderJob, outcome: Result<RenderResult, JobError>) {
        for attempt in 1..=REPORT_ATTEMPTS {
            let report = match &outcome {
                Ok(result) => {
                    self.control
                        .complete(&job.id, &self.config.worker_id, result.clone())
                        .await
                }
                Err(error) => {
                    self.control
                        .fail(&job.id, &self.config.worker_id, error.clone())
                        .await
                }
            };

            match report {
                Ok(()) => return,
                Err(e) if attempt < REPORT_ATTEMPTS => {
                    warn!(
                        job_id = %job.id,
                        attempt,
                        "Terminal report failed, retrying: {}", e
                    );
                    tokio::time::sleep(REPORT_BACKOFF).await;
                }
                Err(e) => {
                    error!(
                        job_id = %job.id,
                        "Giving up on terminal report, leaving job to the stale-claim reaper: {}",
                        e
                    );
                }
            }
        }
    }
}
