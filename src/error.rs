//! Error taxonomy for the prediction backend.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Closed set of failure kinds for a prediction call.
///
/// Every failure surfaced to a caller is one of these; raw worker output is
/// never forwarded unclassified. The wire codes keep the worker's historical
/// `ERROR_*` prefix convention so existing clients stay compatible.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    DataFetch(String),

    #[error("{0}")]
    DataParse(String),

    #[error("{0}")]
    EnvironmentMissing(String),

    #[error("{0}")]
    ProcessSpawnFailure(String),

    #[error("Worker execution timed out after {elapsed_secs:.1} seconds")]
    Timeout { elapsed_secs: f64 },

    #[error("{0}")]
    WorkerExecutionFailure(String),

    #[error("No valid output received from worker")]
    EmptyOutput,

    /// `detail` keeps the raw offending line for logging; it is never sent
    /// to the client.
    #[error("Failed to parse worker output: {detail}")]
    OutputParseFailure { detail: String },

    #[error("{0}")]
    InvalidResponseShape(String),

    #[error("{message}")]
    CriticalWorkerCrash {
        message: String,
        traceback: Option<String>,
    },

    #[error("{0}")]
    UnclassifiedPrediction(String),

    #[error("{0}")]
    Unexpected(String),
}

impl Error {
    /// HTTP status for this kind. Bad input and worker-reported data
    /// problems are the caller's to fix; everything else is operational.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) | Error::DataFetch(_) | Error::DataParse(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code in the worker's wire convention.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "ERROR_INVALID_INPUT",
            Error::DataFetch(_) => "ERROR_DATA_FETCH",
            Error::DataParse(_) => "ERROR_DATA_PARSE",
            Error::EnvironmentMissing(_) => "ERROR_ENVIRONMENT",
            Error::ProcessSpawnFailure(_) => "ERROR_PROCESS_SPAWN",
            Error::Timeout { .. } => "ERROR_TIMEOUT",
            Error::WorkerExecutionFailure(_) => "ERROR_PYTHON_FAILURE",
            Error::EmptyOutput => "ERROR_EMPTY_OUTPUT",
            Error::OutputParseFailure { .. } => "ERROR_PARSE_FAILURE",
            Error::InvalidResponseShape(_) => "ERROR_INVALID_RESPONSE",
            Error::CriticalWorkerCrash { .. } => "500_CRITICAL_PYTHON_CRASH",
            Error::UnclassifiedPrediction(_) => "ERROR_PREDICTION",
            Error::Unexpected(_) => "ERROR_UNEXPECTED",
        }
    }

    /// Message safe to put in the response body. Diagnostic internals stay
    /// in the logs, except for the crash traceback which is surfaced by
    /// contract.
    fn client_message(&self) -> String {
        match self {
            Error::OutputParseFailure { .. } => {
                "Failed to parse prediction output from worker".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.wire_code(), "prediction failed: {self}");
        } else {
            tracing::warn!(code = self.wire_code(), "prediction rejected: {self}");
        }

        let mut body = json!({
            "error": self.client_message(),
            "code": self.wire_code(),
        });
        if let Error::CriticalWorkerCrash { traceback, .. } = &self {
            body["traceback"] = json!(traceback);
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_400() {
        for err in [
            Error::InvalidInput("bad".into()),
            Error::DataFetch("no data".into()),
            Error::DataParse("bad data".into()),
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_server_errors_map_to_500() {
        for err in [
            Error::EnvironmentMissing("no script".into()),
            Error::ProcessSpawnFailure("enoent".into()),
            Error::Timeout { elapsed_secs: 60.2 },
            Error::WorkerExecutionFailure("exit 1".into()),
            Error::EmptyOutput,
            Error::OutputParseFailure {
                detail: "xyz".into(),
            },
            Error::InvalidResponseShape("not an object".into()),
            Error::CriticalWorkerCrash {
                message: "boom".into(),
                traceback: None,
            },
            Error::UnclassifiedPrediction("weird".into()),
            Error::Unexpected("huh".into()),
        ] {
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_wire_codes_keep_worker_convention() {
        assert_eq!(
            Error::Timeout { elapsed_secs: 1.0 }.wire_code(),
            "ERROR_TIMEOUT"
        );
        assert_eq!(
            Error::CriticalWorkerCrash {
                message: "boom".into(),
                traceback: None
            }
            .wire_code(),
            "500_CRITICAL_PYTHON_CRASH"
        );
    }

    #[test]
    fn test_parse_failure_detail_not_in_client_message() {
        let err = Error::OutputParseFailure {
            detail: "raw garbage line".into(),
        };
        assert!(!err.client_message().contains("raw garbage line"));
        // but the Display form used for logging keeps it
        assert!(err.to_string().contains("raw garbage line"));
    }

    #[test]
    fn test_timeout_message_reports_elapsed() {
        let err = Error::Timeout { elapsed_secs: 60.23 };
        assert!(err.to_string().contains("60.2"));
    }
}
