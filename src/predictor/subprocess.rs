//! Subprocess-backed predictor.
//!
//! Each prediction spawns one fresh worker process; nothing is shared or
//! reused between calls, so concurrent requests run their own workers in
//! parallel. The worker gets the model path, scaler bounds and input on its
//! command line, writes a final JSON envelope to stdout, and is killed if it
//! outlives the configured timeout.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use super::envelope::{self, ResultEnvelope};
use super::request::{PredictionRequest, ScalerConfig};
use super::Predictor;
use crate::config::WorkerConfig;
use crate::error::{Error, Result};

pub struct SubprocessPredictor {
    config: WorkerConfig,
    scaler: ScalerConfig,
}

impl SubprocessPredictor {
    pub fn new(config: WorkerConfig, scaler: ScalerConfig) -> Self {
        Self { config, scaler }
    }

    /// Verify everything the worker needs before spawning anything.
    ///
    /// Probed fresh on every call rather than cached, so an artifact removed
    /// while the service runs is reported on the next request instead of
    /// being masked by a stale readiness flag.
    fn check_environment(&self) -> Result<()> {
        if !Path::new(&self.config.script).exists() {
            return Err(Error::EnvironmentMissing(format!(
                "Prediction script not found at {}",
                self.config.script
            )));
        }
        if !Path::new(&self.config.model).exists() {
            return Err(Error::EnvironmentMissing(format!(
                "Model artifact not found at {}; run the training pipeline to generate it",
                self.config.model
            )));
        }
        // Relative interpreter names are assumed resolvable via PATH.
        let interpreter = Path::new(&self.config.interpreter);
        if interpreter.is_absolute() && !interpreter.exists() {
            return Err(Error::EnvironmentMissing(format!(
                "Worker interpreter not found at {}",
                self.config.interpreter
            )));
        }
        Ok(())
    }

    fn build_command(&self, request: &PredictionRequest) -> Result<Command> {
        let mut cmd = Command::new(&self.config.interpreter);
        cmd.arg(&self.config.script)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--min")
            .arg(self.scaler.min.to_string())
            .arg("--max")
            .arg(self.scaler.max.to_string());

        match request {
            PredictionRequest::Ticker(symbol) => {
                cmd.arg("--ticker").arg(symbol);
            }
            PredictionRequest::Series(values) => {
                let encoded = serde_json::to_string(values)
                    .map_err(|e| Error::Unexpected(format!("Failed to encode input series: {e}")))?;
                cmd.arg("--data").arg(encoded);
            }
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }

    /// Run the worker to completion, enforcing the timeout, and return its
    /// full stdout. Every exit path leaves no live process behind.
    async fn run_worker(&self, request: &PredictionRequest) -> Result<String> {
        let mut cmd = self.build_command(request)?;
        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| Error::ProcessSpawnFailure(format!("Failed to start worker process: {e}")))?;
        tracing::debug!(pid = ?child.id(), "worker process started");

        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                terminate(child, self.config.kill_grace_secs).await;
                return Err(Error::Unexpected(format!("Failed waiting for worker: {e}")));
            }
            Err(_elapsed) => {
                let elapsed_secs = start.elapsed().as_secs_f64();
                tracing::error!(elapsed_secs, "worker timed out, terminating");
                terminate(child, self.config.kill_grace_secs).await;
                return Err(Error::Timeout { elapsed_secs });
            }
        };

        let stdout = stdout_task
            .await
            .map_err(|e| Error::Unexpected(format!("Worker stdout reader failed: {e}")))?;
        let stderr = stderr_task
            .await
            .map_err(|e| Error::Unexpected(format!("Worker stderr reader failed: {e}")))?;

        if self.config.log_stderr && !stderr.is_empty() {
            tracing::debug!(stderr = %stderr, "worker stderr");
        }

        if !status.success() {
            let stderr = stderr.trim();
            let detail = if stderr.is_empty() {
                format!("Worker process exited abnormally ({status})")
            } else {
                format!("Worker process exited abnormally ({status}): {stderr}")
            };
            return Err(Error::WorkerExecutionFailure(detail));
        }

        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "worker finished");
        Ok(stdout)
    }
}

#[async_trait]
impl Predictor for SubprocessPredictor {
    async fn predict(&self, request: &PredictionRequest) -> Result<ResultEnvelope> {
        self.check_environment()?;
        let stdout = self.run_worker(request).await?;
        let line = envelope::last_output_line(&stdout)?;
        envelope::classify_output(line)
    }
}

/// Buffer a child output stream in full.
async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Stop a worker that is no longer wanted: SIGTERM first on Unix, then a
/// hard kill if it has not exited within the grace period. Waits for the
/// exit either way so the process is reaped before returning.
async fn terminate(mut child: Child, grace_secs: u64) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
    }

    match tokio::time::timeout(Duration::from_secs(grace_secs), child.wait()).await {
        Ok(Ok(status)) => {
            tracing::debug!("worker exited with {status} after termination request");
        }
        Ok(Err(e)) => {
            tracing::warn!("error waiting for terminated worker: {e}");
        }
        Err(_timeout) => {
            tracing::warn!("worker ignored termination request, killing");
            let _ = child.kill().await;
        }
    }
}
