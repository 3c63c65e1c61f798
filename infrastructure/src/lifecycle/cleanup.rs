//! Ordered, idempotent shutdown of transports and processes
//!
//! [`CleanupCoordinator`] owns the process registry (server name to process)
//! and the [`TransportManager`]. A shutdown always closes transports first
//! and only then terminates processes, all processes concurrently.
//!
//! Termination escalates: SIGTERM, wait up to the graceful timeout, then
//! exactly one kill, wait up to the kill timeout. A process that survives
//! even that is logged and left alone.

use super::error::{LifecycleError, panic_message};
use super::events::{CleanupPhase, LifecycleEvent, LifecycleEvents, NoLifecycleEvents};
use super::guard::ReentrancyGuard;
use super::process::ManagedProcess;
use super::report::{BatchReport, ShutdownReport};
use super::transport::TransportManager;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default graceful termination timeout.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
/// Default wait after the forced kill.
pub const DEFAULT_KILL_WAIT: Duration = Duration::from_secs(2);

/// How a process ended up stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// It had exited before cleanup; no signal was sent.
    AlreadyExited(i32),
    /// It exited after the graceful request.
    Terminated(Option<i32>),
    /// It needed a kill. `None` if it was still not confirmed dead.
    Killed(Option<i32>),
}

pub struct CleanupCoordinator {
    transports: Arc<TransportManager>,
    processes: Mutex<HashMap<String, Arc<dyn ManagedProcess>>>,
    cleanup_lock: tokio::sync::Mutex<()>,
    cleaning: AtomicBool,
    kill_wait: Duration,
    events: Arc<dyn LifecycleEvents>,
}

impl CleanupCoordinator {
    pub fn new(transports: Arc<TransportManager>) -> Self {
        Self {
            transports,
            processes: Mutex::new(HashMap::new()),
            cleanup_lock: tokio::sync::Mutex::new(()),
            cleaning: AtomicBool::new(false),
            kill_wait: DEFAULT_KILL_WAIT,
            events: Arc::new(NoLifecycleEvents),
        }
    }

    pub fn with_kill_wait(mut self, kill_wait: Duration) -> Self {
        self.kill_wait = kill_wait;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn LifecycleEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn transports(&self) -> &Arc<TransportManager> {
        &self.transports
    }

    /// Track `process` under `name`. The last registration wins.
    pub fn register_process(&self, name: &str, process: Arc<dyn ManagedProcess>) {
        let previous = self
            .processes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), process);

        if previous.is_some() {
            warn!("Process '{}' was already registered, replacing it", name);
            self.events.emit(LifecycleEvent::ProcessReplaced {
                name: name.to_string(),
            });
        } else {
            debug!("Registered process '{}'", name);
            self.events.emit(LifecycleEvent::ProcessRegistered {
                name: name.to_string(),
            });
        }
    }

    pub fn unregister_process(&self, name: &str) -> Option<Arc<dyn ManagedProcess>> {
        self.processes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
    }

    pub fn process(&self, name: &str) -> Option<Arc<dyn ManagedProcess>> {
        self.processes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    pub fn process_count(&self) -> usize {
        self.processes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Stop one process with graceful-then-forceful escalation.
    ///
    /// `Err` only when sending a signal failed.
    pub async fn cleanup_process(
        &self,
        name: &str,
        process: Arc<dyn ManagedProcess>,
        timeout: Duration,
    ) -> Result<TerminationOutcome, LifecycleError> {
        terminate_process(
            name.to_string(),
            process,
            timeout,
            self.kill_wait,
            self.events.clone(),
        )
        .await
    }

    /// Close all transports, then stop all registered processes.
    ///
    /// A second caller while a shutdown is running gets a skipped report.
    /// Every process whose escalation completed is dropped from the registry
    /// afterwards, including one that survived the kill. Only processes that
    /// could not be signalled stay registered for another attempt.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        let Some(_guard) = ReentrancyGuard::try_acquire(&self.cleaning) else {
            debug!("Shutdown already in progress, skipping");
            self.events.emit(LifecycleEvent::CleanupSkipped {
                phase: CleanupPhase::Shutdown,
            });
            return ShutdownReport::skipped();
        };
        let _lock = self.cleanup_lock.lock().await;
        self.events.emit(LifecycleEvent::CleanupStarted {
            phase: CleanupPhase::Shutdown,
        });

        let transports = self.transports.cleanup(timeout).await;

        let snapshot: Vec<(String, Arc<dyn ManagedProcess>)> = self
            .processes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(name, process)| (name.clone(), process.clone()))
            .collect();

        let mut processes = BatchReport::new(snapshot.len());
        let mut set = JoinSet::new();
        for (name, process) in snapshot {
            let kill_wait = self.kill_wait;
            let events = self.events.clone();
            let process_ref = process.clone();
            set.spawn(async move {
                let result = AssertUnwindSafe(terminate_process(
                    name.clone(),
                    process,
                    timeout,
                    kill_wait,
                    events,
                ))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(LifecycleError::Panicked(panic_message(panic.as_ref())))
                });
                (name, process_ref, result)
            });
        }

        // Processes whose escalation ran to the end, confirmed dead or not
        let mut settled: Vec<(String, Arc<dyn ManagedProcess>)> = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, process, Ok(outcome))) => {
                    if outcome == TerminationOutcome::Killed(None) {
                        warn!("Giving up on '{}'; it will not be signalled again", name);
                    }
                    processes.record_success();
                    settled.push((name, process));
                }
                Ok((name, _, Err(e))) => processes.record_failure(name, e),
                Err(e) => processes.record_failure("process", e),
            }
        }

        self.processes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|name, process| {
                let done = process.returncode().is_some()
                    || settled
                        .iter()
                        .any(|(n, p)| n == name && Arc::ptr_eq(p, process));
                if done {
                    debug!("Removing process '{}' from the registry", name);
                }
                !done
            });

        info!(
            "Shutdown finished: transports {}, processes {}",
            transports, processes
        );
        self.events.emit(LifecycleEvent::CleanupFinished {
            phase: CleanupPhase::Shutdown,
            succeeded: processes.succeeded,
            attempted: processes.attempted,
        });

        ShutdownReport {
            skipped: false,
            transports,
            processes,
        }
    }
}

async fn terminate_process(
    name: String,
    process: Arc<dyn ManagedProcess>,
    timeout: Duration,
    kill_wait: Duration,
    events: Arc<dyn LifecycleEvents>,
) -> Result<TerminationOutcome, LifecycleError> {
    if let Some(code) = process.returncode() {
        debug!("'{}' already exited with code {}", name, code);
        events.emit(LifecycleEvent::ProcessAlreadyExited { name, code });
        return Ok(TerminationOutcome::AlreadyExited(code));
    }

    info!("Terminating '{}' (pid {:?})", name, process.pid());
    if let Err(source) = process.terminate() {
        error!("Failed to terminate '{}': {}", name, source);
        events.emit(LifecycleEvent::ProcessCleanupFailed {
            name: name.clone(),
            error: source.to_string(),
        });
        return Err(LifecycleError::Signal { name, source });
    }

    if let Ok(code) = tokio::time::timeout(timeout, process.wait()).await {
        info!("'{}' terminated with code {:?}", name, code);
        events.emit(LifecycleEvent::ProcessTerminated { name, code });
        return Ok(TerminationOutcome::Terminated(code));
    }

    warn!(
        "'{}' did not exit within {:?} of SIGTERM, killing",
        name, timeout
    );
    if let Err(source) = process.kill() {
        error!("Failed to kill '{}': {}", name, source);
        events.emit(LifecycleEvent::ProcessCleanupFailed {
            name: name.clone(),
            error: source.to_string(),
        });
        return Err(LifecycleError::Signal { name, source });
    }

    let code = tokio::time::timeout(kill_wait, process.wait())
        .await
        .ok()
        .flatten();
    if code.is_none() {
        warn!("'{}' still not confirmed dead after kill", name);
    }
    events.emit(LifecycleEvent::ProcessKilled { name, code });
    Ok(TerminationOutcome::Killed(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::events::RecordingEvents;
    use crate::lifecycle::process::tests::MockProcess;
    use crate::lifecycle::transport::tests::MockTransport;

    fn coordinator(events: Arc<RecordingEvents>) -> CleanupCoordinator {
        CleanupCoordinator::new(Arc::new(TransportManager::with_events(events.clone())))
            .with_events(events)
    }

    #[tokio::test]
    async fn test_already_exited_process_is_not_signalled() {
        let events = Arc::new(RecordingEvents::default());
        let coordinator = coordinator(events.clone());
        let process = Arc::new(MockProcess::exited(0));

        let outcome = coordinator
            .cleanup_process("fs", process.clone(), DEFAULT_SHUTDOWN_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(outcome, TerminationOutcome::AlreadyExited(0));
        assert_eq!(process.terminates(), 0);
        assert_eq!(process.kills(), 0);
        assert_eq!(events.count("process_already_exited"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_termination() {
        let coordinator = coordinator(Arc::new(RecordingEvents::default()));
        let process = Arc::new(MockProcess::slow_to_terminate(Duration::from_secs(1)));

        let outcome = coordinator
            .cleanup_process("fs", process.clone(), DEFAULT_SHUTDOWN_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(outcome, TerminationOutcome::Terminated(Some(-15)));
        assert_eq!(process.terminates(), 1);
        assert_eq!(process.kills(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stubborn_process_is_killed_within_bound() {
        let events = Arc::new(RecordingEvents::default());
        let coordinator = coordinator(events.clone());
        let process = Arc::new(MockProcess::slow_to_terminate(Duration::from_secs(6)));

        let start = tokio::time::Instant::now();
        let outcome = coordinator
            .cleanup_process("fs", process.clone(), Duration::from_secs(5))
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(outcome, TerminationOutcome::Killed(Some(-9)));
        assert_eq!(process.kills(), 1);
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed <= Duration::from_secs(5) + DEFAULT_KILL_WAIT);
        assert_eq!(events.count("process_killed"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_one_kill_even_if_kill_wait_expires() {
        let coordinator = coordinator(Arc::new(RecordingEvents::default()));
        let process = Arc::new(MockProcess::unkillable());

        let outcome = coordinator
            .cleanup_process("fs", process.clone(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(outcome, TerminationOutcome::Killed(None));
        assert_eq!(process.terminates(), 1);
        assert_eq!(process.kills(), 1);
    }

    #[tokio::test]
    async fn test_terminate_error_is_returned() {
        let events = Arc::new(RecordingEvents::default());
        let coordinator = coordinator(events.clone());
        let process = Arc::new(MockProcess::failing_terminate());

        let result = coordinator
            .cleanup_process("fs", process, DEFAULT_SHUTDOWN_TIMEOUT)
            .await;

        assert!(matches!(result, Err(LifecycleError::Signal { .. })));
        assert_eq!(events.count("process_cleanup_failed"), 1);
    }

    #[tokio::test]
    async fn test_register_overwrite_keeps_last() {
        let events = Arc::new(RecordingEvents::default());
        let coordinator = coordinator(events.clone());
        let first = Arc::new(MockProcess::running());
        let second = Arc::new(MockProcess::running());

        coordinator.register_process("fs", first.clone());
        coordinator.register_process("fs", second.clone());
        assert_eq!(coordinator.process_count(), 1);
        assert_eq!(events.count("process_replaced"), 1);

        coordinator.shutdown(DEFAULT_SHUTDOWN_TIMEOUT).await;
        assert_eq!(first.terminates(), 0);
        assert_eq!(second.terminates(), 1);
    }

    #[tokio::test]
    async fn test_transports_close_before_processes() {
        let events = Arc::new(RecordingEvents::default());
        let coordinator = coordinator(events.clone());
        let transport = Arc::new(MockTransport::new("fs"));
        coordinator.transports().register(&transport);
        coordinator.register_process("fs", Arc::new(MockProcess::running()));

        let report = coordinator.shutdown(DEFAULT_SHUTDOWN_TIMEOUT).await;

        assert_eq!(report.transports.succeeded, 1);
        assert_eq!(report.processes.succeeded, 1);
        let order: Vec<&str> = events
            .events()
            .iter()
            .map(|e| e.category())
            .filter(|c| *c == "transport_closed" || *c == "process_terminated")
            .collect();
        assert_eq!(order, vec!["transport_closed", "process_terminated"]);
        // Exited entries are dropped
        assert_eq!(coordinator.process_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_shutdown_runs_once() {
        let events = Arc::new(RecordingEvents::default());
        let coordinator = coordinator(events.clone());
        let process = Arc::new(MockProcess::slow_to_terminate(Duration::from_secs(1)));
        coordinator.register_process("fs", process.clone());

        let (first, second) = tokio::join!(
            coordinator.shutdown(DEFAULT_SHUTDOWN_TIMEOUT),
            coordinator.shutdown(DEFAULT_SHUTDOWN_TIMEOUT)
        );

        assert!(!first.skipped);
        assert!(second.skipped);
        assert_eq!(process.terminates(), 1);
        assert_eq!(events.count("cleanup_skipped"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_surviving_kill_is_not_retried() {
        let events = Arc::new(RecordingEvents::default());
        let coordinator = coordinator(events.clone());
        let process = Arc::new(MockProcess::unkillable());
        coordinator.register_process("fs", process.clone());

        let first = coordinator.shutdown(Duration::from_secs(5)).await;
        assert_eq!(first.processes.succeeded, 1);
        assert_eq!(coordinator.process_count(), 0);

        let start = tokio::time::Instant::now();
        let second = coordinator.shutdown(Duration::from_secs(5)).await;
        assert_eq!(second.processes.attempted, 0);
        assert!(start.elapsed() < Duration::from_secs(1));

        assert_eq!(process.terminates(), 1);
        assert_eq!(process.kills(), 1);
        assert_eq!(events.count("process_killed"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacement_registered_during_shutdown_is_kept() {
        let coordinator = Arc::new(coordinator(Arc::new(RecordingEvents::default())));
        let stubborn = Arc::new(MockProcess::unkillable());
        let replacement = Arc::new(MockProcess::running());
        coordinator.register_process("fs", stubborn.clone());

        let running = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.shutdown(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        coordinator.register_process("fs", replacement.clone());
        running.await.unwrap();

        assert_eq!(coordinator.process_count(), 1);
        assert_eq!(replacement.terminates(), 0);
    }

    #[tokio::test]
    async fn test_flag_cleared_after_failed_run() {
        let coordinator = coordinator(Arc::new(RecordingEvents::default()));
        let process = Arc::new(MockProcess::failing_terminate());
        coordinator.register_process("fs", process.clone());

        let first = coordinator.shutdown(DEFAULT_SHUTDOWN_TIMEOUT).await;
        assert_eq!(first.processes.failures.len(), 1);

        let second = coordinator.shutdown(DEFAULT_SHUTDOWN_TIMEOUT).await;
        assert!(!second.skipped);
        assert_eq!(process.terminates(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_cleared_after_cancelled_run() {
        let coordinator = coordinator(Arc::new(RecordingEvents::default()));
        let process = Arc::new(MockProcess::unkillable());
        coordinator.register_process("fs", process.clone());

        let cancelled =
            tokio::time::timeout(Duration::from_secs(1), coordinator.shutdown(DEFAULT_SHUTDOWN_TIMEOUT))
                .await;
        assert!(cancelled.is_err());

        let report = coordinator.shutdown(Duration::from_millis(10)).await;
        assert!(!report.skipped);
    }
}
