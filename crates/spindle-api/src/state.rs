//! Application state.

use std::sync::Arc;

use spindle_store::JobStore;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub store: Arc<dyn JobStore>,
}

impl AppState {
    /// Create application state over a job store.
    pub fn new(config: ApiConfig, store: Arc<dyn JobStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}
