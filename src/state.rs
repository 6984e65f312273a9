//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::predictor::Predictor;

/// Shared state passed to all handlers. Read-only after startup; handlers
/// never coordinate through it.
pub struct AppState {
    pub config: Config,
    pub predictor: Arc<dyn Predictor>,
}

impl AppState {
    pub fn new(config: Config, predictor: Arc<dyn Predictor>) -> Self {
        Self { config, predictor }
    }
}
