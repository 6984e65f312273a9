//! Prediction endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::predictor::{
    MetricsBundle, PredictionRequest, RawPredictRequest, ResultEnvelope, SeriesBundle,
};
use crate::state::AppState;

/// Build the predict router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/predict", post(predict))
}

/// Client-facing prediction body. Optional fields serialize as `null`
/// rather than being omitted, so callers can rely on the shape.
#[derive(Debug, Serialize)]
struct PredictResponse {
    prediction: f64,
    meta: Meta,
    series: Option<SeriesBundle>,
    metrics: Option<MetricsBundle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    normalized_pred: Option<f64>,
    timesteps: Option<u32>,
    last_close: Option<f64>,
}

impl From<ResultEnvelope> for PredictResponse {
    fn from(envelope: ResultEnvelope) -> Self {
        Self {
            prediction: envelope.predicted,
            meta: Meta {
                normalized_pred: envelope.normalized_pred,
                timesteps: envelope.timesteps,
                last_close: envelope.last_close,
            },
            // A response without a series stays null; the original request
            // data is never echoed back.
            series: envelope.series,
            metrics: envelope.metrics,
        }
    }
}

/// POST /api/predict - predict the next closing price for a ticker symbol
/// or a 60-point price series.
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RawPredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(raw) = payload.map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;
    let request = PredictionRequest::from_raw(raw)?;

    match &request {
        PredictionRequest::Ticker(symbol) => tracing::debug!(%symbol, "ticker prediction request"),
        PredictionRequest::Series(values) => {
            tracing::debug!(points = values.len(), "series prediction request")
        }
    }

    let envelope = state.predictor.predict(&request).await?;
    Ok(Json(PredictResponse::from(envelope)))
}
