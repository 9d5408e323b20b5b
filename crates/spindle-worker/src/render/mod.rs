//! Kind-specific job renderers.
//!
//! Every renderer follows the same shape: download source assets into the
//! job's scratch directory, invoke FFmpeg, upload the artifact, return the
//! terminal result. The scratch directory is a `TempDir` removed on all
//! exit paths.

mod artwork;
mod gif;
mod poster;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use spindle_media::{check_ffmpeg, Downloader, FfmpegRunner};
use spindle_models::{FailureKind, JobPayload, RenderJob, RenderResult};
use spindle_storage::R2Client;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Executes one claimed job to a terminal result.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn render(&self, job: &RenderJob) -> WorkerResult<RenderResult>;
}

/// The production renderer: FFmpeg + R2.
pub struct Renderer {
    pub(crate) storage: R2Client,
    pub(crate) downloader: Downloader,
    pub(crate) ffmpeg: FfmpegRunner,
    work_dir: PathBuf,
}

impl Renderer {
    /// Create a renderer. Failures here (missing ffmpeg, missing storage
    /// credentials) are startup configuration errors.
    pub async fn new(config: &WorkerConfig) -> WorkerResult<Self> {
        check_ffmpeg()?;
        let storage = R2Client::from_env()?;
        tokio::fs::create_dir_all(&config.work_dir).await?;

        Ok(Self {
            storage,
            downloader: Downloader::new()?,
            ffmpeg: FfmpegRunner::new(config.render_timeout),
            work_dir: PathBuf::from(&config.work_dir),
        })
    }

    /// Upload the artifact and build the terminal result.
    pub(crate) async fn upload_artifact(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> WorkerResult<RenderResult> {
        let size_bytes = tokio::fs::metadata(path).await.ok().map(|m| m.len());
        self.storage.upload_file(path, key, content_type).await?;
        let artifact_url = self.storage.public_url(key).await?;

        Ok(RenderResult {
            artifact_url,
            content_type: content_type.to_string(),
            size_bytes,
        })
    }
}

#[async_trait]
impl JobRunner for Renderer {
    async fn render(&self, job: &RenderJob) -> WorkerResult<RenderResult> {
        let payload = JobPayload::decode(job.kind, &job.payload).map_err(|e| {
            WorkerError::execution(FailureKind::Internal, format!("undecodable payload: {e}"))
        })?;

        // Dropped on every exit path, removing the scratch directory.
        let workdir = tempfile::tempdir_in(&self.work_dir)?;

        match payload {
            JobPayload::Poster(p) => poster::render(self, job, &p, workdir.path()).await,
            JobPayload::Gif(p) => gif::render(self, job, &p, workdir.path()).await,
            JobPayload::Artwork(p) => artwork::render(self, job, &p, workdir.path()).await,
        }
    }
}

/// Escape a string for use inside an FFmpeg drawtext `text='...'` value.
pub(crate) fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            ':' => escaped.push_str("\\:"),
            '%' => escaped.push_str("\\%"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Make an untrusted string safe as one object-key path segment.
pub(crate) fn safe_key_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
