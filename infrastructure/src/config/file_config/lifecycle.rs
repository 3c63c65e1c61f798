//! Lifecycle timeouts from TOML (`[lifecycle]` section)

use crate::lifecycle::{InterruptMode, LifecycleSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle configuration from TOML
///
/// # Example
///
/// ```toml
/// [lifecycle]
/// shutdown_timeout_ms = 5000
/// kill_wait_ms = 2000
/// interrupt = "polling"
/// cleanup_log = ""          # disable the cleanup log file
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLifecycleConfig {
    /// Graceful timeout per server on shutdown
    pub shutdown_timeout_ms: u64,
    /// Wait after a forced kill
    pub kill_wait_ms: u64,
    /// Wait for cancelled supervising tasks
    pub task_cancel_timeout_ms: u64,
    /// Bound on each tool server request
    pub request_timeout_ms: u64,
    pub interrupt: InterruptMode,
    /// Lifecycle log file; empty disables it
    pub cleanup_log: String,
}

impl Default for FileLifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: 5000,
            kill_wait_ms: 2000,
            task_cancel_timeout_ms: 2000,
            request_timeout_ms: 60_000,
            interrupt: InterruptMode::Auto,
            cleanup_log: "toolrouter-cleanup.log".to_string(),
        }
    }
}

impl FileLifecycleConfig {
    pub fn settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
            kill_wait: Duration::from_millis(self.kill_wait_ms),
            task_cancel_timeout: Duration::from_millis(self.task_cancel_timeout_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cleanup_log_path(&self) -> Option<&str> {
        let path = self.cleanup_log.trim();
        (!path.is_empty()).then_some(path)
    }
}
