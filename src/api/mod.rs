//! HTTP API for the prediction backend.

pub mod health;
pub mod predict;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().merge(predict::router())
}
