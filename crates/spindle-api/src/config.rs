//! API configuration.

use std::time::Duration;

use thiserror::Error;

/// Missing or malformed startup configuration. Fatal at process start;
/// everything else is contained per-request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingVar(&'static str),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection string for the job store
    pub database_url: String,
    /// Pre-shared worker credential (X-Worker-Token)
    pub worker_token: String,
    /// Pre-shared admin/enqueue credential (X-Admin-Token)
    pub admin_token: String,
    /// Max request body size
    pub max_body_size: usize,
    /// Whether the stale-claim reaper runs in this process
    pub stale_reaper_enabled: bool,
    /// Interval between reaper sweeps
    pub stale_reaper_interval: Duration,
    /// Age past which a claim is considered stale
    pub stale_claim_after: Duration,
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
            worker_token: std::env::var("WORKER_TOKEN")
                .map_err(|_| ConfigError::MissingVar("WORKER_TOKEN"))?,
            admin_token: std::env::var("ADMIN_TOKEN")
                .map_err(|_| ConfigError::MissingVar("ADMIN_TOKEN"))?,
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024),
            stale_reaper_enabled: std::env::var("ENABLE_STALE_REAPER")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            stale_reaper_interval: Duration::from_secs(
                std::env::var("STALE_REAPER_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            stale_claim_after: Duration::from_secs(
                std::env::var("STALE_CLAIM_AFTER_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
            ),
        })
    }
}
