//! Interrupt strategies
//!
//! An interrupt always ends in the same place: the lifecycle manager's
//! shutdown followed by cancellation of the running scope. The strategies only
//! differ in where the interrupt is noticed.
//!
//! - [`SignalInterrupt`] listens for Ctrl-C on the runtime and requests the
//!   shutdown in the background.
//! - [`PollingInterrupt`] installs nothing. The input loop notices Ctrl-C
//!   itself and calls [`InterruptTrigger::fire`], which awaits the shutdown.

use super::error::LifecycleError;
use super::report::ShutdownReport;
use super::server::ServerLifecycleManager;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Configured interrupt strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptMode {
    /// `Signal` where the platform delivers SIGINT to the runtime, `Polling`
    /// on Windows.
    #[default]
    Auto,
    Signal,
    Polling,
}

impl InterruptMode {
    /// Resolve `Auto` for the current platform.
    pub fn resolve(self) -> Self {
        match self {
            InterruptMode::Auto if cfg!(windows) => InterruptMode::Polling,
            InterruptMode::Auto => InterruptMode::Signal,
            other => other,
        }
    }

    pub fn handler(self) -> Box<dyn InterruptHandler> {
        match self.resolve() {
            InterruptMode::Polling => Box::new(PollingInterrupt),
            _ => Box::new(SignalInterrupt),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterruptMode::Auto => "auto",
            InterruptMode::Signal => "signal",
            InterruptMode::Polling => "polling",
        }
    }
}

impl fmt::Display for InterruptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InterruptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(InterruptMode::Auto),
            "signal" => Ok(InterruptMode::Signal),
            "polling" | "poll" => Ok(InterruptMode::Polling),
            other => Err(format!(
                "Unknown interrupt mode '{}' (expected auto, signal or polling)",
                other
            )),
        }
    }
}

/// Runs the shutdown path and interrupts the scope that owns `token`.
#[derive(Clone)]
pub struct InterruptTrigger {
    manager: Arc<ServerLifecycleManager>,
    token: CancellationToken,
    pending: Arc<Mutex<Option<JoinHandle<ShutdownReport>>>>,
}

impl InterruptTrigger {
    pub fn new(manager: Arc<ServerLifecycleManager>, token: CancellationToken) -> Self {
        Self {
            manager,
            token,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Await the shutdown, then interrupt the scope.
    pub async fn fire(&self) {
        if self.is_fired() {
            return;
        }
        info!("Interrupt requested, shutting down servers");
        let report = self.manager.shutdown().await;
        debug!("Interrupt shutdown: {:?}", report);
        self.token.cancel();
    }

    /// Start the shutdown in the background and interrupt the scope at once.
    ///
    /// The scope's teardown waits for the background shutdown through
    /// [`settle`](Self::settle) before running its own.
    pub fn fire_detached(&self) {
        if self.is_fired() {
            return;
        }
        info!("Interrupt received, requesting shutdown");
        match Handle::try_current() {
            Ok(runtime) => {
                let manager = self.manager.clone();
                let handle = runtime.spawn(async move { manager.shutdown().await });
                *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
            }
            Err(_) => error!("No async runtime for the interrupt shutdown"),
        }
        self.token.cancel();
    }

    /// Wait, at most `timeout`, for a background shutdown started by
    /// [`fire_detached`](Self::fire_detached).
    pub async fn settle(&self, timeout: Duration) {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(handle) = pending else {
            return;
        };
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(report)) => debug!("Background shutdown finished: {:?}", report),
            Ok(Err(e)) => error!("Background shutdown task failed: {}", e),
            Err(_) => warn!("Background shutdown still running after {:?}", timeout),
        }
    }
}

/// Installs the interrupt source for one scope.
pub trait InterruptHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start listening. Anything installed must stop once `stop` is cancelled.
    fn install(&self, trigger: InterruptTrigger, stop: CancellationToken)
        -> Result<(), LifecycleError>;
}

/// Ctrl-C through `tokio::signal`.
pub struct SignalInterrupt;

impl InterruptHandler for SignalInterrupt {
    fn name(&self) -> &'static str {
        "signal"
    }

    fn install(
        &self,
        trigger: InterruptTrigger,
        stop: CancellationToken,
    ) -> Result<(), LifecycleError> {
        let runtime = Handle::try_current()
            .map_err(|_| LifecycleError::NoRuntime("interrupt listener".to_string()))?;
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = stop.cancelled() => debug!("Interrupt listener stopped"),
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => trigger.fire_detached(),
                    Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
                },
            }
        });
        debug!("Installed Ctrl-C listener");
        Ok(())
    }
}

/// No listener; the caller fires the trigger from its input loop.
pub struct PollingInterrupt;

impl InterruptHandler for PollingInterrupt {
    fn name(&self) -> &'static str {
        "polling"
    }

    fn install(
        &self,
        _trigger: InterruptTrigger,
        _stop: CancellationToken,
    ) -> Result<(), LifecycleError> {
        debug!("Polling interrupt mode: no listener installed");
        Ok(())
    }
}
