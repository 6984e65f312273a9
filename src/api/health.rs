//! Health check endpoint.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// GET /health - liveness probe for the dashboard.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": env!("CARGO_PKG_NAME") })),
    )
}
