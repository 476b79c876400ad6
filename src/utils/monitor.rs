use serde::Serialize;

/// Snapshot of the server process, reported by `/api/health` when enabled.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub memory_usage_percent: f32,
    pub peak_memory_mb: u64,
    pub uptime_ms: u64,
}

#[cfg(feature = "cli")]
mod imp {
    use super::ProcessStats;
    use std::sync::Mutex;
    use std::time::Instant;
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

    pub struct ProcessMonitor {
        system: Mutex<System>,
        pid: Option<Pid>,
        start_time: Instant,
        peak_memory: Mutex<u64>,
        enabled: bool,
    }

    impl ProcessMonitor {
        pub fn new(enabled: bool) -> Self {
            let pid = match sysinfo::get_current_pid() {
                Ok(pid) => Some(pid),
                Err(e) => {
                    tracing::warn!("Process monitoring unavailable: {}", e);
                    None
                }
            };

            let mut system = System::new();
            if let (true, Some(pid)) = (enabled, pid) {
                refresh_own_process(&mut system, pid);
            }

            Self {
                system: Mutex::new(system),
                pid,
                start_time: Instant::now(),
                peak_memory: Mutex::new(0),
                enabled: enabled && pid.is_some(),
            }
        }

        pub fn stats(&self) -> Option<ProcessStats> {
            if !self.enabled {
                return None;
            }

            let pid = self.pid?;
            let mut system = self.system.lock().ok()?;
            refresh_own_process(&mut system, pid);

            let process = system.process(pid)?;
            let memory_mb = process.memory() / 1024 / 1024;
            let total_memory = system.total_memory() / 1024 / 1024;
            let memory_percent = if total_memory > 0 {
                (memory_mb as f32 / total_memory as f32) * 100.0
            } else {
                0.0
            };

            let mut peak = self.peak_memory.lock().ok()?;
            if memory_mb > *peak {
                *peak = memory_mb;
            }

            Some(ProcessStats {
                cpu_usage: process.cpu_usage(),
                memory_usage_mb: memory_mb,
                memory_usage_percent: memory_percent,
                peak_memory_mb: *peak,
                uptime_ms: self.start_time.elapsed().as_millis() as u64,
            })
        }

        pub fn log_stats(&self, phase: &str) {
            if let Some(stats) = self.stats() {
                tracing::info!(
                    "📊 {} - CPU: {:.1}%, Memory: {}MB ({:.1}%), Peak: {}MB",
                    phase,
                    stats.cpu_usage,
                    stats.memory_usage_mb,
                    stats.memory_usage_percent,
                    stats.peak_memory_mb
                );
            }
        }

        pub fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    // Only this process and the memory totals; a full refresh walks every process.
    fn refresh_own_process(system: &mut System, pid: Pid) {
        system.refresh_memory();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
    }
}

// Builds without the `cli` feature get a no-op monitor.
#[cfg(not(feature = "cli"))]
mod imp {
    use super::ProcessStats;

    pub struct ProcessMonitor;

    impl ProcessMonitor {
        pub fn new(_enabled: bool) -> Self {
            Self
        }

        pub fn stats(&self) -> Option<ProcessStats> {
            None
        }

        pub fn log_stats(&self, _phase: &str) {}

        pub fn is_enabled(&self) -> bool {
            false
        }
    }
}

pub use imp::ProcessMonitor;

impl Default for ProcessMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
