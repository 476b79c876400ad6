//! Subprocess bridge to the external stage scripts.
//!
//! A script is run to completion; its last non-empty stdout line is the
//! result and must be JSON. Everything printed before that line is treated as
//! progress output and logged at debug level.

use crate::domain::ports::{ScriptInvocation, ScriptOutput, ScriptRunner};
use crate::utils::error::{DashboardError, Result};
use crate::utils::monitor::ProcessMonitor;
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, warn};

const STDERR_TAIL_CHARS: usize = 2000;

pub struct ProcessRunner {
    monitor: Arc<ProcessMonitor>,
}

impl ProcessRunner {
    pub fn new(monitor: Arc<ProcessMonitor>) -> Self {
        Self { monitor }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Arc::new(ProcessMonitor::default()))
    }
}

#[async_trait]
impl ScriptRunner for ProcessRunner {
    async fn run(&self, invocation: ScriptInvocation) -> Result<ScriptOutput> {
        let mut command = Command::new(&invocation.interpreter);
        command.arg(&invocation.script).args(&invocation.args);
        if let Some(params) = &invocation.params {
            command.arg(params.to_string());
        }
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(
            "▶️ Running {} script: {} {}",
            invocation.name,
            invocation.interpreter,
            invocation.script.display()
        );
        self.monitor.log_stats(&format!("before {}", invocation.name));

        let started = Instant::now();
        let pending = command.output();
        let output = match invocation.timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("⏱️ {} script exceeded {:?}, killing it", invocation.name, limit);
                    return Err(DashboardError::ScriptTimeout {
                        script: invocation.name,
                        seconds: limit.as_secs(),
                    });
                }
            },
            None => pending.await,
        }
        .map_err(|e| DashboardError::ScriptFailed {
            script: invocation.name.clone(),
            code: None,
            stderr: format!("failed to start '{}': {}", invocation.interpreter, e),
        })?;
        let duration = started.elapsed();

        self.monitor.log_stats(&format!("after {}", invocation.name));

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(
            "{} script finished in {:?} with {} (stdout {} bytes, stderr {} bytes)",
            invocation.name,
            duration,
            output.status,
            output.stdout.len(),
            output.stderr.len()
        );

        for line in progress_lines(&stdout) {
            debug!("[{}] {}", invocation.name, line);
        }

        if !output.status.success() {
            return Err(DashboardError::ScriptFailed {
                script: invocation.name,
                code: output.status.code(),
                stderr: tail_chars(stderr.trim(), STDERR_TAIL_CHARS).to_string(),
            });
        }

        let value = parse_last_json_line(&invocation.name, &stdout)?;
        check_reported_status(&invocation.name, &value)?;

        info!("✅ {} script completed in {:?}", invocation.name, duration);
        Ok(ScriptOutput {
            value,
            stderr,
            duration,
        })
    }
}

/// Non-empty stdout lines printed before the result line.
fn progress_lines(stdout: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    lines.pop();
    lines
}

/// Parses the last non-empty line of `stdout` as JSON.
pub fn parse_last_json_line(script: &str, stdout: &str) -> Result<Value> {
    let line = stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or_else(|| DashboardError::ScriptOutputError {
            script: script.to_string(),
            message: "no output".to_string(),
        })?;

    serde_json::from_str(line).map_err(|e| DashboardError::ScriptOutputError {
        script: script.to_string(),
        message: format!("last line is not JSON ({}): {}", e, tail_chars(line, 200)),
    })
}

/// Scripts may exit 0 and still report `{"status": "error", "message": ...}`.
pub fn check_reported_status(script: &str, value: &Value) -> Result<()> {
    if value.get("status").and_then(Value::as_str) == Some("error") {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(DashboardError::ScriptReported {
            script: script.to_string(),
            message,
        });
    }
    Ok(())
}

fn tail_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().rev().nth(max_chars.saturating_sub(1)) {
        Some((idx, _)) if max_chars > 0 => &s[idx..],
        Some(_) => "",
        None => s,
    }
}
