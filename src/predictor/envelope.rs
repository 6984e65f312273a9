//! Worker output decoding and failure classification.
//!
//! The worker may print diagnostic lines before its result; only the last
//! non-blank stdout line is authoritative. That line is decoded as a JSON
//! envelope and either passed through as a success or resolved to exactly
//! one taxonomy kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Envelope code for a worker that caught its own crash and reported it
/// structurally before exiting.
pub const CRITICAL_CRASH_CODE: &str = "500_CRITICAL_PYTHON_CRASH";

/// Older workers reported crashes under this code with a `details` field.
const LEGACY_CRASH_CODE: &str = "500_PYTHON_CRASH";

/// Decoded success payload from the worker's final output line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub predicted: f64,
    #[serde(default)]
    pub normalized_pred: Option<f64>,
    #[serde(default)]
    pub timesteps: Option<u32>,
    #[serde(default)]
    pub last_close: Option<f64>,
    #[serde(default)]
    pub series: Option<SeriesBundle>,
    #[serde(default)]
    pub metrics: Option<MetricsBundle>,
}

/// Raw feature series the worker used, forwarded for visualization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesBundle {
    #[serde(default)]
    pub close: Option<Vec<f64>>,
    #[serde(default)]
    pub rsi: Option<Vec<f64>>,
    #[serde(default)]
    pub macd: Option<Vec<f64>>,
}

/// Model quality metrics, when the worker computed them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBundle {
    #[serde(default)]
    pub rmse: Option<f64>,
    #[serde(default)]
    pub mae: Option<f64>,
    #[serde(default)]
    pub directional_accuracy: Option<f64>,
}

/// Isolate the authoritative final line of the worker's stdout.
pub fn last_output_line(stdout: &str) -> Result<&str> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .ok_or(Error::EmptyOutput)
}

/// Decode the final output line and resolve it to a success envelope or one
/// taxonomy kind.
pub fn classify_output(line: &str) -> Result<ResultEnvelope> {
    let value: Value = serde_json::from_str(line).map_err(|e| Error::OutputParseFailure {
        detail: format!("{e}; raw line: {line}"),
    })?;

    if !value.is_object() {
        return Err(Error::InvalidResponseShape(
            "Worker output is not a JSON object".to_string(),
        ));
    }

    if value.get("error_code").and_then(Value::as_str) == Some(CRITICAL_CRASH_CODE) {
        return Err(Error::CriticalWorkerCrash {
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Worker process crashed")
                .to_string(),
            traceback: value
                .get("traceback")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }

    if let Some(error) = value.get("error") {
        // Backwards-compatible crash alias used by older worker scripts.
        if error.as_str() == Some(LEGACY_CRASH_CODE) {
            if let Some(details) = value.get("details").and_then(Value::as_str) {
                return Err(Error::CriticalWorkerCrash {
                    message: details.to_string(),
                    traceback: None,
                });
            }
        }

        if let Some(text) = error.as_str() {
            if let Some(classified) = classify_wire_prefix(text) {
                return Err(classified);
            }
        }

        let detail = match error {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        return Err(Error::UnclassifiedPrediction(detail));
    }

    let envelope: ResultEnvelope = serde_json::from_value(value).map_err(|e| {
        Error::InvalidResponseShape(format!("Prediction value is missing or invalid: {e}"))
    })?;
    if !envelope.predicted.is_finite() {
        return Err(Error::InvalidResponseShape(
            "Prediction value is missing or invalid".to_string(),
        ));
    }
    Ok(envelope)
}

/// Map a recognized `ERROR_*` wire prefix to its taxonomy kind, stripping
/// the prefix from the detail. Prefixes without a kind of their own (e.g.
/// `ERROR_DATA_VALIDATION`, `ERROR_RUNTIME`) are left for the caller to
/// treat as unclassified, which keeps them server-side errors.
fn classify_wire_prefix(text: &str) -> Option<Error> {
    let (prefix, rest) = match text.split_once(':') {
        Some((prefix, rest)) => (prefix.trim(), rest.trim()),
        None => (text.trim(), ""),
    };
    let detail = if rest.is_empty() {
        text.trim().to_string()
    } else {
        rest.to_string()
    };

    match prefix {
        "ERROR_DATA_FETCH" => Some(Error::DataFetch(detail)),
        "ERROR_DATA_PARSE" => Some(Error::DataParse(detail)),
        "ERROR_INVALID_INPUT" => Some(Error::InvalidInput(detail)),
        _ => None,
    }
}
