//! Stock prediction backend.
//!
//! Validates prediction requests, delegates inference to an external worker
//! process (one fresh spawn per request, supervised with a hard timeout),
//! classifies worker failures into a closed taxonomy and relays structured
//! results over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod predictor;
pub mod state;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use state::AppState;

/// Build the full application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::router())
        .route("/health", get(api::health::health))
        .layer(middleware::from_fn(logging::request_logger))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
