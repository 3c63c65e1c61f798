//! Tool server lifecycle management
//!
//! [`ServerLifecycleManager`] is the single owner of everything a session
//! starts: it spawns server processes and registers them for cleanup, runs
//! supervising tasks in its [`TaskRegistry`], and exposes the one
//! [`shutdown`](ServerLifecycleManager::shutdown) entry point used by both
//! normal exit and interrupts.

use super::cleanup::{CleanupCoordinator, DEFAULT_KILL_WAIT, DEFAULT_SHUTDOWN_TIMEOUT};
use super::error::LifecycleError;
use super::events::{LifecycleEvent, LifecycleEvents, NoLifecycleEvents};
use super::process::{ChildProcess, ManagedProcess, ProcessPipes};
use super::report::ShutdownReport;
use super::tasks::TaskRegistry;
use super::transport::TransportManager;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Timeouts used during teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Graceful timeout per process (transports get half of it)
    pub shutdown_timeout: Duration,
    /// Wait after the forced kill
    pub kill_wait: Duration,
    /// Wait for aborted tasks to finish
    pub task_cancel_timeout: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            kill_wait: DEFAULT_KILL_WAIT,
            task_cancel_timeout: Duration::from_secs(2),
        }
    }
}

pub struct ServerLifecycleManager {
    coordinator: Arc<CleanupCoordinator>,
    tasks: TaskRegistry,
    settings: LifecycleSettings,
    events: Arc<dyn LifecycleEvents>,
}

impl ServerLifecycleManager {
    pub fn new(settings: LifecycleSettings) -> Self {
        Self::with_events(settings, Arc::new(NoLifecycleEvents))
    }

    pub fn with_events(settings: LifecycleSettings, events: Arc<dyn LifecycleEvents>) -> Self {
        let transports = Arc::new(TransportManager::with_events(events.clone()));
        let coordinator = CleanupCoordinator::new(transports)
            .with_kill_wait(settings.kill_wait)
            .with_events(events.clone());
        Self {
            coordinator: Arc::new(coordinator),
            tasks: TaskRegistry::new(),
            settings,
            events,
        }
    }

    pub fn coordinator(&self) -> &Arc<CleanupCoordinator> {
        &self.coordinator
    }

    pub fn transports(&self) -> &Arc<TransportManager> {
        self.coordinator.transports()
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Spawn a server process and register it for cleanup under `name`.
    pub fn create_server_process(
        &self,
        name: &str,
        argv: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<(Arc<ChildProcess>, ProcessPipes), LifecycleError> {
        let (process, pipes) = ChildProcess::spawn(name, argv, env)?;
        self.coordinator.register_process(name, process.clone());
        Ok((process, pipes))
    }

    /// Run `future` as a tracked task.
    pub fn add_server<F>(&self, name: &str, future: F) -> Result<JoinHandle<()>, LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(name, future)
    }

    /// Track a task that waits for `process` and terminates it if the task
    /// is cancelled first.
    pub fn supervise(
        &self,
        name: &str,
        process: Arc<dyn ManagedProcess>,
    ) -> Result<JoinHandle<()>, LifecycleError> {
        self.add_server(name, supervise_process(name.to_string(), process))
    }

    /// Shut down with the configured timeout.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.shutdown_with_timeout(self.settings.shutdown_timeout)
            .await
    }

    pub async fn shutdown_with_timeout(&self, timeout: Duration) -> ShutdownReport {
        self.events.emit(LifecycleEvent::ShutdownRequested);

        let active = self.tasks.active_count();
        let processes = self.coordinator.process_count();
        if active == 0 && processes == 0 {
            debug!("Nothing to shut down");
            return ShutdownReport::default();
        }

        info!(
            "Shutting down {} servers ({} active tasks)",
            processes, active
        );
        self.coordinator.shutdown(timeout).await
    }

    /// Abort all tracked tasks, bounded by the configured cancel timeout.
    pub async fn cancel_tasks(&self) -> usize {
        let count = self
            .tasks
            .cancel_all(self.settings.task_cancel_timeout)
            .await;
        if count > 0 {
            info!("Cancelled {} tasks", count);
        }
        self.events.emit(LifecycleEvent::TasksCancelled { count });
        count
    }
}

/// Wait for `process` to exit; terminate it if dropped before that.
pub async fn supervise_process(name: String, process: Arc<dyn ManagedProcess>) {
    let _guard = TerminateOnDrop {
        name: name.clone(),
        process: process.clone(),
    };
    match process.wait().await {
        Some(code) => info!("Server '{}' exited with code {}", name, code),
        None => warn!("Lost track of server '{}'", name),
    }
}

struct TerminateOnDrop {
    name: String,
    process: Arc<dyn ManagedProcess>,
}

impl Drop for TerminateOnDrop {
    fn drop(&mut self) {
        if self.process.returncode().is_none() {
            debug!("Supervisor for '{}' dropped, terminating", self.name);
            if let Err(e) = self.process.terminate() {
                warn!("Failed to terminate '{}': {}", self.name, e);
            }
        }
    }
}
