//! Lifecycle event observer
//!
//! Every lifecycle transition is logged through `tracing`. The same
//! transitions are also reported as [`LifecycleEvent`]s to an optional
//! [`LifecycleEvents`] observer, so callers (and tests) can react to
//! categories without scraping log output.

/// Which cleanup sequence an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPhase {
    /// `TransportManager::cleanup`
    Transports,
    /// `CleanupCoordinator::shutdown`
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    ProcessRegistered { name: String },
    ProcessReplaced { name: String },
    ProcessAlreadyExited { name: String, code: i32 },
    ProcessTerminated { name: String, code: Option<i32> },
    ProcessKilled { name: String, code: Option<i32> },
    ProcessCleanupFailed { name: String, error: String },
    TransportClosed { label: String },
    TransportCloseFailed { label: String, error: String },
    CleanupStarted { phase: CleanupPhase },
    CleanupFinished { phase: CleanupPhase, succeeded: usize, attempted: usize },
    CleanupSkipped { phase: CleanupPhase },
    ShutdownRequested,
    TasksCancelled { count: usize },
}

impl LifecycleEvent {
    /// Stable category name.
    pub fn category(&self) -> &'static str {
        match self {
            LifecycleEvent::ProcessRegistered { .. } => "process_registered",
            LifecycleEvent::ProcessReplaced { .. } => "process_replaced",
            LifecycleEvent::ProcessAlreadyExited { .. } => "process_already_exited",
            LifecycleEvent::ProcessTerminated { .. } => "process_terminated",
            LifecycleEvent::ProcessKilled { .. } => "process_killed",
            LifecycleEvent::ProcessCleanupFailed { .. } => "process_cleanup_failed",
            LifecycleEvent::TransportClosed { .. } => "transport_closed",
            LifecycleEvent::TransportCloseFailed { .. } => "transport_close_failed",
            LifecycleEvent::CleanupStarted { .. } => "cleanup_started",
            LifecycleEvent::CleanupFinished { .. } => "cleanup_finished",
            LifecycleEvent::CleanupSkipped { .. } => "cleanup_skipped",
            LifecycleEvent::ShutdownRequested => "shutdown_requested",
            LifecycleEvent::TasksCancelled { .. } => "tasks_cancelled",
        }
    }
}

/// Observer for lifecycle transitions.
///
/// `emit` is called inline from cleanup paths, so it must not block.
pub trait LifecycleEvents: Send + Sync {
    fn emit(&self, event: LifecycleEvent);
}

/// Default observer: tracing output only.
pub struct NoLifecycleEvents;

impl LifecycleEvents for NoLifecycleEvents {
    fn emit(&self, _event: LifecycleEvent) {}
}

/// Collects events in order.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingEvents {
    events: std::sync::Mutex<Vec<LifecycleEvent>>,
}

#[cfg(test)]
impl RecordingEvents {
    pub(crate) fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, category: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.category() == category)
            .count()
    }
}

#[cfg(test)]
impl LifecycleEvents for RecordingEvents {
    fn emit(&self, event: LifecycleEvent) {
        self.events.lock().unwrap().push(event);
    }
}
