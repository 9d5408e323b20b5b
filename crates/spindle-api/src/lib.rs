//! Control API for the Spindle render backend.
//!
//! This crate provides:
//! - The job claim endpoint workers poll (atomic hand-off, one job max)
//! - Worker terminal-report endpoints (complete/fail)
//! - Enqueue and admin endpoints (retry, queue status)
//! - The stale-claim reaper background service

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::StaleClaimReaper;
pub use state::AppState;
