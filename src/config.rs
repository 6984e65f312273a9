//! Configuration for the prediction backend.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::predictor::ScalerConfig;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Normalization bounds assumed by the trained model. Fixed for the
    /// process lifetime and shared read-only across requests.
    #[serde(default)]
    pub scaler: ScalerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Inference worker process configuration.
///
/// The worker is an external script run once per prediction request; it gets
/// the model artifact path and scaler bounds on its command line and writes a
/// single JSON envelope as its final stdout line.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Interpreter used to run the worker script. Relative names are
    /// resolved via PATH.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Path to the prediction script.
    #[serde(default = "default_script")]
    pub script: String,
    /// Path to the trained model artifact.
    #[serde(default = "default_model")]
    pub model: String,
    /// Wall-clock budget for one worker run; the process is killed on expiry.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Grace period between SIGTERM and a hard kill when terminating.
    #[serde(default = "default_kill_grace")]
    pub kill_grace_secs: u64,
    /// Log the worker's stderr stream at debug level (default: false).
    #[serde(default)]
    pub log_stderr: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script: default_script(),
            model: default_model(),
            timeout_secs: default_timeout(),
            kill_grace_secs: default_kill_grace(),
            log_stderr: false,
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}
fn default_interpreter() -> String {
    "python3".to_string()
}
fn default_script() -> String {
    "predict.py".to_string()
}
fn default_model() -> String {
    "model/model.keras".to_string()
}
fn default_timeout() -> u64 {
    60
}
fn default_kill_grace() -> u64 {
    5
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (PREDICTOR__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("PREDICTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;

        if config.scaler.min >= config.scaler.max {
            return Err(ConfigError::Message(format!(
                "scaler.min ({}) must be strictly below scaler.max ({})",
                config.scaler.min, config.scaler.max
            )));
        }
        if config.worker.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "worker.timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}
