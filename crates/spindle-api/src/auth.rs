//! Pre-shared token authentication.
//!
//! Two service-to-service credentials: workers present `X-Worker-Token` on
//! claim/report calls; the app backend and operators present `X-Admin-Token`
//! on enqueue/admin calls. A rejected credential changes no job state.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

const WORKER_TOKEN_HEADER: &str = "x-worker-token";
const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

fn header_token<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extractor proving the caller holds the worker credential.
pub struct WorkerAuth;

#[axum::async_trait]
impl FromRequestParts<AppState> for WorkerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match header_token(parts, WORKER_TOKEN_HEADER) {
            Some(token) if token == state.config.worker_token => Ok(WorkerAuth),
            Some(_) => Err(ApiError::unauthorized("invalid worker token")),
            None => Err(ApiError::unauthorized("missing worker token")),
        }
    }
}

/// Extractor proving the caller holds the admin credential.
pub struct AdminAuth;

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match header_token(parts, ADMIN_TOKEN_HEADER) {
            Some(token) if token == state.config.admin_token => Ok(AdminAuth),
            Some(_) => Err(ApiError::unauthorized("invalid admin token")),
            None => Err(ApiError::unauthorized("missing admin token")),
        }
    }
}
