//! Render worker.
//!
//! This crate provides:
//! - The worker loop: poll the claim endpoint, execute one job at a time,
//!   report a terminal status for every claimed job
//! - The HTTP control client (claim/complete/fail)
//! - Kind-specific renderers (poster, gif, artwork)

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod render;

pub use client::{ApiClient, JobControl};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::WorkerLoop;
pub use logging::JobLogger;
pub use render::{JobRunner, Renderer};
