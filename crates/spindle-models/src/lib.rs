//! Shared data models for the Spindle render backend.
//!
//! This crate defines:
//! - Render job records and their lifecycle status
//! - Job kinds and type-specific payloads
//! - Terminal result/error shapes written by workers

pub mod job;
pub mod payload;

pub use job::{
    FailureKind, JobCounts, JobError, JobId, JobKind, JobStatus, NewRenderJob, RenderJob,
    RenderResult,
};
pub use payload::{ArtworkPayload, GifPayload, JobPayload, PayloadError, PosterPayload};
