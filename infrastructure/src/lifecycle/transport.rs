//! Transport tracking and bounded-time closing
//!
//! A transport is the communication channel to a tool server (for MCP
//! servers: the stdio connection). [`TransportManager`] tracks transports
//! without owning them. Entries are `Weak`, keyed by the `Arc`'s pointer
//! identity, so a transport dropped elsewhere simply disappears from the next
//! cleanup.

use super::error::{LifecycleError, panic_message};
use super::events::{CleanupPhase, LifecycleEvent, LifecycleEvents, NoLifecycleEvents};
use super::guard::ReentrancyGuard;
use super::report::BatchReport;
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Default bound for a full transport cleanup.
pub const DEFAULT_CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

/// A closable communication channel.
#[async_trait]
pub trait ManagedTransport: Send + Sync {
    /// Name used in logs and reports.
    fn label(&self) -> String {
        "transport".to_string()
    }

    fn is_closing(&self) -> bool;

    /// Start closing. Must not block.
    fn close(&self) -> std::io::Result<()>;

    /// Resolve once the transport has finished closing.
    ///
    /// Transports that cannot report completion keep the default, which
    /// resolves immediately.
    async fn wait_closed(&self) {}
}

/// Result of closing one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// `close()` was called and `wait_closed()` resolved in time.
    Closed,
    /// Someone else already started closing it.
    AlreadyClosing,
    /// `close()` was called but completion was not confirmed in time.
    Unconfirmed,
}

type TransportId = usize;

fn transport_id<T: ?Sized>(transport: &Arc<T>) -> TransportId {
    Arc::as_ptr(transport).cast::<()>() as usize
}

/// Tracks live transports and closes them as a batch.
pub struct TransportManager {
    transports: Mutex<HashMap<TransportId, Weak<dyn ManagedTransport>>>,
    cleanup_lock: tokio::sync::Mutex<()>,
    closing: AtomicBool,
    events: Arc<dyn LifecycleEvents>,
}

impl Default for TransportManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportManager {
    pub fn new() -> Self {
        Self::with_events(Arc::new(NoLifecycleEvents))
    }

    pub fn with_events(events: Arc<dyn LifecycleEvents>) -> Self {
        Self {
            transports: Mutex::new(HashMap::new()),
            cleanup_lock: tokio::sync::Mutex::new(()),
            closing: AtomicBool::new(false),
            events,
        }
    }

    /// Start tracking `transport`. Registering the same `Arc` twice is a no-op.
    ///
    /// Returns `true` if the transport was not tracked before.
    pub fn register<T: ManagedTransport + 'static>(&self, transport: &Arc<T>) -> bool {
        let id = transport_id(transport);
        let as_dyn: Arc<dyn ManagedTransport> = transport.clone();
        let mut transports = self.transports.lock().unwrap_or_else(|e| e.into_inner());
        if transports.contains_key(&id) {
            return false;
        }
        debug!("Tracking transport '{}'", transport.label());
        transports.insert(id, Arc::downgrade(&as_dyn));
        true
    }

    /// Stop tracking `transport`. Absence is not an error.
    pub fn unregister<T: ManagedTransport + ?Sized>(&self, transport: &Arc<T>) -> bool {
        self.transports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&transport_id(transport))
            .is_some()
    }

    /// Number of tracked transports that are still alive.
    pub fn len(&self) -> usize {
        self.transports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live members, pruning entries whose transport is gone.
    fn snapshot(&self) -> Vec<Arc<dyn ManagedTransport>> {
        let mut transports = self.transports.lock().unwrap_or_else(|e| e.into_inner());
        transports.retain(|_, weak| weak.strong_count() > 0);
        transports.values().filter_map(Weak::upgrade).collect()
    }

    /// Close a single transport, waiting at most `timeout` for confirmation.
    pub async fn close_transport(
        &self,
        transport: Arc<dyn ManagedTransport>,
        timeout: Duration,
    ) -> Result<CloseOutcome, LifecycleError> {
        close_one(transport, timeout, self.events.clone()).await
    }

    /// Close every tracked transport concurrently and forget them all.
    ///
    /// Each transport gets `timeout / 2`. A second caller while a cleanup is
    /// running returns a skipped report immediately.
    pub async fn cleanup(&self, timeout: Duration) -> BatchReport {
        let Some(_guard) = ReentrancyGuard::try_acquire(&self.closing) else {
            debug!("Transport cleanup already in progress, skipping");
            self.events.emit(LifecycleEvent::CleanupSkipped {
                phase: CleanupPhase::Transports,
            });
            return BatchReport::skipped();
        };
        let _lock = self.cleanup_lock.lock().await;
        let _clear = ClearOnDrop(&self.transports);

        let live = self.snapshot();
        if live.is_empty() {
            debug!("No transports to close");
            return BatchReport::default();
        }

        self.events.emit(LifecycleEvent::CleanupStarted {
            phase: CleanupPhase::Transports,
        });
        info!("Closing {} transports", live.len());

        let per_transport = timeout / 2;
        let mut report = BatchReport::new(live.len());
        let mut set = JoinSet::new();
        for transport in live {
            let events = self.events.clone();
            set.spawn(async move {
                let label = transport.label();
                let result = AssertUnwindSafe(close_one(transport, per_transport, events))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(LifecycleError::Panicked(panic_message(panic.as_ref())))
                    });
                (label, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(_))) => report.record_success(),
                Ok((label, Err(e))) => report.record_failure(label, e),
                Err(e) => report.record_failure("transport", e),
            }
        }

        info!(
            "Transport cleanup: {}/{} closed",
            report.succeeded, report.attempted
        );
        self.events.emit(LifecycleEvent::CleanupFinished {
            phase: CleanupPhase::Transports,
            succeeded: report.succeeded,
            attempted: report.attempted,
        });
        report
    }
}

/// Empties the tracked set however cleanup exits.
struct ClearOnDrop<'a>(&'a Mutex<HashMap<TransportId, Weak<dyn ManagedTransport>>>);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

async fn close_one(
    transport: Arc<dyn ManagedTransport>,
    timeout: Duration,
    events: Arc<dyn LifecycleEvents>,
) -> Result<CloseOutcome, LifecycleError> {
    let label = transport.label();

    if transport.is_closing() {
        debug!("Transport '{}' is already closing", label);
        return Ok(CloseOutcome::AlreadyClosing);
    }

    if let Err(source) = transport.close() {
        warn!("Failed to close transport '{}': {}", label, source);
        events.emit(LifecycleEvent::TransportCloseFailed {
            label: label.clone(),
            error: source.to_string(),
        });
        return Err(LifecycleError::TransportClose { label, source });
    }

    let outcome = match tokio::time::timeout(timeout, transport.wait_closed()).await {
        Ok(()) => {
            debug!("Transport '{}' closed", label);
            CloseOutcome::Closed
        }
        Err(_) => {
            warn!(
                "Transport '{}' did not confirm close within {:?}",
                label, timeout
            );
            CloseOutcome::Unconfirmed
        }
    };
    events.emit(LifecycleEvent::TransportClosed { label });
    Ok(outcome)
}
