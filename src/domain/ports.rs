use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// One run of an external stage script.
#[derive(Debug, Clone)]
pub struct ScriptInvocation {
    /// Stage name, used in logs and error messages.
    pub name: String,
    pub interpreter: String,
    pub script: PathBuf,
    pub args: Vec<String>,
    /// Serialized request parameters, passed as the final argument.
    pub params: Option<Value>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ScriptOutput {
    /// Parsed last non-empty stdout line.
    pub value: Value,
    pub stderr: String,
    pub duration: Duration,
}

#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, invocation: ScriptInvocation) -> Result<ScriptOutput>;
}
