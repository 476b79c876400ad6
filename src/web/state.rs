//! Shared application state for the web server.

use crate::config::AppConfig;
use crate::core::{ProcessRunner, ScriptRunner, StageService};
use crate::utils::monitor::ProcessMonitor;
use std::sync::Arc;

/// Shared state injected into every Axum handler. Immutable after startup.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stages: StageService,
    pub monitor: Arc<ProcessMonitor>,
}

impl AppState {
    pub fn new(config: AppConfig, runner: Arc<dyn ScriptRunner>, monitor: Arc<ProcessMonitor>) -> Self {
        let config = Arc::new(config);
        Self {
            stages: StageService::new(config.clone(), runner),
            config,
            monitor,
        }
    }

    /// State backed by real subprocesses.
    pub fn with_process_runner(config: AppConfig) -> Self {
        let monitor = Arc::new(ProcessMonitor::new(config.monitoring.enabled));
        let runner = Arc::new(ProcessRunner::new(monitor.clone()));
        Self::new(config, runner, monitor)
    }
}

pub type SharedState = Arc<AppState>;
