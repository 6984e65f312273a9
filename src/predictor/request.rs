//! Request validation and scaler bounds.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Number of timesteps the trained model consumes.
pub const SERIES_LEN: usize = 60;

/// Raw body of `POST /api/predict`, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct RawPredictRequest {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<Value>>,
}

/// A validated prediction request: either a price series matching the model
/// input shape exactly, or a ticker symbol the worker resolves itself.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRequest {
    Series(Vec<f64>),
    Ticker(String),
}

impl PredictionRequest {
    /// Validate a raw request body.
    ///
    /// A non-blank ticker takes precedence over a simultaneously supplied
    /// data array. Series longer than 60 points are trimmed to the last 60,
    /// matching the rule the dashboard applies before submitting; shorter
    /// series are rejected.
    pub fn from_raw(raw: RawPredictRequest) -> Result<Self> {
        if let Some(ticker) = &raw.ticker {
            let ticker = ticker.trim();
            if !ticker.is_empty() {
                return Ok(Self::Ticker(ticker.to_uppercase()));
            }
        }

        let data = raw.data.filter(|d| !d.is_empty()).ok_or_else(|| {
            Error::InvalidInput(
                "Body must include either ticker symbol or non-empty array of historical prices"
                    .to_string(),
            )
        })?;

        let mut values = Vec::with_capacity(data.len());
        for element in &data {
            match element.as_f64() {
                Some(n) if n.is_finite() => values.push(n),
                _ => {
                    return Err(Error::InvalidInput(
                        "All elements must be valid finite numbers".to_string(),
                    ))
                }
            }
        }

        if values.len() > SERIES_LEN {
            let excess = values.len() - SERIES_LEN;
            values.drain(..excess);
        }

        Self::from_series(values)
    }

    /// Build the series variant. The worker contract is exactly 60 finite
    /// points; no partial acceptance.
    pub fn from_series(values: Vec<f64>) -> Result<Self> {
        if values.len() != SERIES_LEN {
            return Err(Error::InvalidInput(format!(
                "Input series must have exactly {SERIES_LEN} elements, got {}",
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(
                "All elements must be valid finite numbers".to_string(),
            ));
        }
        Ok(Self::Series(values))
    }
}

/// MinMaxScaler bounds from the training run.
///
/// The backend only forwards these to the worker; `normalize` and
/// `denormalize` document the inverse pair the worker applies, with
/// `normalize(denormalize(x)) ≈ x` within float tolerance.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScalerConfig {
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
        }
    }
}

// Fixed bounds from the training configuration.
fn default_min() -> f64 {
    50.694803
}
fn default_max() -> f64 {
    199.957651
}

impl ScalerConfig {
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    pub fn denormalize(&self, value: f64) -> f64 {
        value * (self.max - self.min) + self.min
    }
}
