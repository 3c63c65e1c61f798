//! Scoped ownership of a session's servers
//!
//! [`EventLoopScope::run`] brackets the whole session. Whatever the body does
//! and however it ends (value, error, panic or interrupt) the scope shuts the
//! servers down and cancels the remaining supervising tasks before returning.

use super::error::LifecycleError;
use super::interrupt::{InterruptHandler, InterruptTrigger};
use super::server::ServerLifecycleManager;
use async_trait::async_trait;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolrouter_application::InterruptPort;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeOutcome<T> {
    Completed(T),
    Interrupted,
}

impl<T> ScopeOutcome<T> {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ScopeOutcome::Interrupted)
    }
}

/// Handle given to the scope body.
#[derive(Clone)]
pub struct ScopeHandle {
    manager: Arc<ServerLifecycleManager>,
    trigger: InterruptTrigger,
}

impl ScopeHandle {
    pub fn manager(&self) -> &Arc<ServerLifecycleManager> {
        &self.manager
    }
}

#[async_trait]
impl InterruptPort for ScopeHandle {
    async fn interrupt(&self) {
        self.trigger.fire().await;
    }

    fn is_interrupted(&self) -> bool {
        self.trigger.is_fired()
    }
}

pub struct EventLoopScope {
    manager: Arc<ServerLifecycleManager>,
    handler: Box<dyn InterruptHandler>,
}

impl EventLoopScope {
    pub fn new(manager: Arc<ServerLifecycleManager>, handler: Box<dyn InterruptHandler>) -> Self {
        Self { manager, handler }
    }

    pub fn manager(&self) -> &Arc<ServerLifecycleManager> {
        &self.manager
    }

    /// Run `body` inside the scope.
    ///
    /// The body races against the interrupt; an interrupted body is dropped
    /// and reported as [`ScopeOutcome::Interrupted`]. Teardown failures are
    /// logged and never replace the body's own error. A panic in the body is
    /// resumed once teardown has finished.
    pub async fn run<T, E, F, Fut>(&self, body: F) -> Result<ScopeOutcome<T>, E>
    where
        F: FnOnce(ScopeHandle) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LifecycleError>,
    {
        let interrupt = CancellationToken::new();
        let stop = CancellationToken::new();
        let trigger = InterruptTrigger::new(self.manager.clone(), interrupt.clone());

        if let Err(e) = self.handler.install(trigger.clone(), stop.clone()) {
            self.teardown(&trigger).await;
            return Err(e.into());
        }
        debug!("Scope opened ({} interrupts)", self.handler.name());

        let handle = ScopeHandle {
            manager: self.manager.clone(),
            trigger: trigger.clone(),
        };
        let body = AssertUnwindSafe(body(handle)).catch_unwind();

        let result = tokio::select! {
            biased;
            _ = interrupt.cancelled() => None,
            result = body => Some(result),
        };

        stop.cancel();
        self.teardown(&trigger).await;

        match result {
            None => {
                info!("Scope interrupted");
                Ok(ScopeOutcome::Interrupted)
            }
            Some(Ok(Ok(value))) => Ok(ScopeOutcome::Completed(value)),
            Some(Ok(Err(e))) => Err(e),
            Some(Err(panic)) => std::panic::resume_unwind(panic),
        }
    }

    async fn teardown(&self, trigger: &InterruptTrigger) {
        let settings = *self.manager.settings();
        trigger.settle(settings.shutdown_timeout + settings.kill_wait).await;

        let report = self.manager.shutdown().await;
        for failure in report.failures() {
            warn!("Cleanup of '{}' failed: {}", failure.subject, failure.error);
        }

        self.manager.cancel_tasks().await;
        debug!("Scope closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::events::RecordingEvents;
    use crate::lifecycle::interrupt::PollingInterrupt;
    use crate::lifecycle::process::tests::MockProcess;
    use crate::lifecycle::server::LifecycleSettings;
    use crate::lifecycle::ManagedProcess;
    use std::time::Duration;

    fn scope(events: Arc<RecordingEvents>) -> EventLoopScope {
        let manager = Arc::new(ServerLifecycleManager::with_events(
            LifecycleSettings::default(),
            events,
        ));
        EventLoopScope::new(manager, Box::new(PollingInterrupt))
    }

    #[derive(Debug, PartialEq)]
    enum BodyError {
        Failed(&'static str),
        Lifecycle(String),
    }

    impl From<LifecycleError> for BodyError {
        fn from(e: LifecycleError) -> Self {
            BodyError::Lifecycle(e.to_string())
        }
    }

    #[tokio::test]
    async fn test_completed_body_returns_value_and_shuts_down() {
        let events = Arc::new(RecordingEvents::default());
        let scope = scope(events.clone());
        let process = Arc::new(MockProcess::running());

        let outcome = scope
            .run(|handle| {
                let process = process.clone();
                async move {
                    handle
                        .manager()
                        .coordinator()
                        .register_process("fs", process);
                    Ok::<_, BodyError>(42)
                }
            })
            .await;

        assert_eq!(outcome, Ok(ScopeOutcome::Completed(42)));
        assert_eq!(process.terminates(), 1);
        assert_eq!(events.count("tasks_cancelled"), 1);
    }

    #[tokio::test]
    async fn test_body_error_propagates_after_single_shutdown() {
        let events = Arc::new(RecordingEvents::default());
        let scope = scope(events.clone());
        let process = Arc::new(MockProcess::running());

        let outcome: Result<ScopeOutcome<()>, BodyError> = scope
            .run(|handle| {
                let process = process.clone();
                async move {
                    handle
                        .manager()
                        .coordinator()
                        .register_process("fs", process);
                    Err(BodyError::Failed("request loop broke"))
                }
            })
            .await;

        assert_eq!(outcome, Err(BodyError::Failed("request loop broke")));
        assert_eq!(events.count("shutdown_requested"), 1);
        assert_eq!(process.terminates(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_cancels_supervisors() {
        let events = Arc::new(RecordingEvents::default());
        let scope = scope(events.clone());
        let processes: Vec<Arc<MockProcess>> = (0..3)
            .map(|_| Arc::new(MockProcess::unkillable()))
            .collect();

        let outcome = scope
            .run(|handle| {
                let processes = processes.clone();
                async move {
                    for (i, process) in processes.into_iter().enumerate() {
                        let process: Arc<dyn ManagedProcess> = process;
                        handle
                            .manager()
                            .supervise(&format!("server-{}", i), process)?;
                    }
                    tokio::task::yield_now().await;
                    handle.interrupt().await;
                    std::future::pending::<()>().await;
                    Ok::<_, BodyError>(())
                }
            })
            .await;

        assert_eq!(outcome, Ok(ScopeOutcome::Interrupted));
        for process in &processes {
            assert_eq!(process.terminates(), 1);
        }
        assert_eq!(scope.manager().tasks().active_count(), 0);
        assert_eq!(events.count("tasks_cancelled"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_does_not_kill_twice() {
        let events = Arc::new(RecordingEvents::default());
        let scope = scope(events.clone());
        let process = Arc::new(MockProcess::unkillable());

        let start = tokio::time::Instant::now();
        let outcome = scope
            .run(|handle| {
                let process = process.clone();
                async move {
                    handle
                        .manager()
                        .coordinator()
                        .register_process("fs", process);
                    handle.interrupt().await;
                    std::future::pending::<()>().await;
                    Ok::<_, BodyError>(())
                }
            })
            .await;

        let settings = LifecycleSettings::default();
        assert_eq!(outcome, Ok(ScopeOutcome::Interrupted));
        assert_eq!(process.terminates(), 1);
        assert_eq!(process.kills(), 1);
        assert_eq!(events.count("process_killed"), 1);
        assert!(start.elapsed() < settings.shutdown_timeout + settings.kill_wait * 2);
    }

    /// Fires the trigger from a background task once the body says so,
    /// the way the Ctrl-C listener does.
    struct SignalOnNotify(Arc<tokio::sync::Notify>);

    impl InterruptHandler for SignalOnNotify {
        fn name(&self) -> &'static str {
            "notify"
        }

        fn install(
            &self,
            trigger: InterruptTrigger,
            stop: CancellationToken,
        ) -> Result<(), LifecycleError> {
            let notify = self.0.clone();
            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => {}
                    _ = notify.notified() => trigger.fire_detached(),
                }
            });
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_interrupt_settles_background_shutdown() {
        let events = Arc::new(RecordingEvents::default());
        let notify = Arc::new(tokio::sync::Notify::new());
        let manager = Arc::new(ServerLifecycleManager::with_events(
            LifecycleSettings::default(),
            events.clone(),
        ));
        let scope = EventLoopScope::new(manager, Box::new(SignalOnNotify(notify.clone())));
        let processes: Vec<Arc<MockProcess>> = (0..2)
            .map(|_| Arc::new(MockProcess::slow_to_terminate(Duration::from_secs(1))))
            .collect();

        let outcome = scope
            .run(|handle| {
                let processes = processes.clone();
                let notify = notify.clone();
                async move {
                    for (i, process) in processes.into_iter().enumerate() {
                        handle
                            .manager()
                            .coordinator()
                            .register_process(&format!("server-{}", i), process);
                    }
                    notify.notify_one();
                    std::future::pending::<()>().await;
                    Ok::<_, BodyError>(())
                }
            })
            .await;

        assert_eq!(outcome, Ok(ScopeOutcome::Interrupted));
        for process in &processes {
            assert_eq!(process.terminates(), 1);
            assert_eq!(process.kills(), 0);
            assert_eq!(process.returncode(), Some(-15));
        }
        // The background run finished; the teardown found nothing left
        assert_eq!(events.count("cleanup_started"), 1);
        assert_eq!(events.count("cleanup_finished"), 1);
        assert_eq!(events.count("cleanup_skipped"), 0);
        assert_eq!(scope.manager().coordinator().process_count(), 0);
    }

    fn explode() -> Result<(), BodyError> {
        panic!("body exploded")
    }

    #[tokio::test]
    async fn test_panicking_body_still_tears_down() {
        let events = Arc::new(RecordingEvents::default());
        let scope = Arc::new(scope(events.clone()));
        let process = Arc::new(MockProcess::running());

        let task = {
            let scope = scope.clone();
            let process = process.clone();
            tokio::spawn(async move {
                scope
                    .run(|handle| async move {
                        handle
                            .manager()
                            .coordinator()
                            .register_process("fs", process);
                        explode()
                    })
                    .await
            })
        };

        let err = task.await.unwrap_err();
        assert!(err.is_panic());
        assert_eq!(process.terminates(), 1);
        assert_eq!(events.count("shutdown_requested"), 1);
    }
}
