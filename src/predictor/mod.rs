//! Prediction orchestration: request validation, worker supervision and
//! output classification.

mod envelope;
mod request;
mod subprocess;

pub use envelope::{MetricsBundle, ResultEnvelope, SeriesBundle, CRITICAL_CRASH_CODE};
pub use request::{PredictionRequest, RawPredictRequest, ScalerConfig, SERIES_LEN};
pub use subprocess::SubprocessPredictor;

use async_trait::async_trait;

use crate::error::Result;

/// Abstraction over the inference backend.
///
/// The real implementation spawns one worker process per call; tests
/// substitute stubs behind this trait.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, request: &PredictionRequest) -> Result<ResultEnvelope>;
}
