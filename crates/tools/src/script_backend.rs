//! Script backend: one interpreter process per document operation.
//!
//! Runs `<interpreter> <scripts_dir>/uno_<operation>.py <args...>` and expects
//! a single JSON object on stdout.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use slidepilot_config::BackendConfig;
use slidepilot_core::backend::DocumentBackend;
use slidepilot_core::error::ToolError;
use tokio::process::Command;
use tracing::{debug, warn};

/// Executes operation scripts with positional arguments and a timeout.
#[derive(Debug, Clone)]
pub struct ScriptBackend {
    interpreter: String,
    scripts_dir: PathBuf,
    timeout: Duration,
}

impl ScriptBackend {
    pub fn new(interpreter: impl Into<String>, scripts_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            scripts_dir: scripts_dir.into(),
            timeout,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.interpreter, &config.scripts_dir, config.timeout())
    }

    /// Script that implements `operation`.
    pub fn script_path(&self, operation: &str) -> PathBuf {
        self.scripts_dir.join(format!("uno_{operation}.py"))
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }
}

#[async_trait]
impl DocumentBackend for ScriptBackend {
    async fn invoke(&self, operation: &str, args: &[String]) -> Result<serde_json::Value, ToolError> {
        let script = self.script_path(operation);
        debug!(
            operation,
            interpreter = %self.interpreter,
            script = %script.display(),
            ?args,
            "Running backend script"
        );

        let child = Command::new(&self.interpreter)
            .arg(&script)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Backend {
                operation: operation.to_string(),
                reason: format!("failed to start {}: {e}", self.interpreter),
                output: String::new(),
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolError::Timeout {
                operation: operation.to_string(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ToolError::Backend {
                operation: operation.to_string(),
                reason: e.to_string(),
                output: String::new(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(operation, exit_code = code, "Backend script failed");
            return Err(ToolError::Backend {
                operation: operation.to_string(),
                reason: format!("exit code {code}"),
                output: combined(&stdout, &stderr),
            });
        }

        parse_payload(operation, &stdout).map_err(|e| match e {
            ToolError::Backend {
                operation, reason, ..
            } => ToolError::Backend {
                operation,
                reason,
                output: combined(&stdout, &stderr),
            },
            other => other,
        })
    }
}

/// Parse script stdout. Anything but a single JSON object is a failure.
pub fn parse_payload(operation: &str, stdout: &str) -> Result<serde_json::Value, ToolError> {
    let value: serde_json::Value =
        serde_json::from_str(stdout.trim()).map_err(|e| ToolError::Backend {
            operation: operation.to_string(),
            reason: format!("invalid JSON output: {e}"),
            output: stdout.to_string(),
        })?;
    if !value.is_object() {
        return Err(ToolError::Backend {
            operation: operation.to_string(),
            reason: "expected a JSON object".into(),
            output: stdout.to_string(),
        });
    }
    Ok(value)
}

fn combined(stdout: &str, stderr: &str) -> String {
    match (stdout.trim(), stderr.trim()) {
        (out, "") => out.to_string(),
        ("", err) => err.to_string(),
        (out, err) => format!("{out}\n{err}"),
    }
}
