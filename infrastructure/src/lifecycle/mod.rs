//! Process lifecycle and transport cleanup
//!
//! Ownership runs top-down: a [`ServerLifecycleManager`] owns the
//! [`CleanupCoordinator`], which owns the [`TransportManager`] and the process
//! registry. Shutdown always closes transports before any process is
//! signalled.
//!
//! All transitions are logged under this module's target, which the binary
//! routes to a dedicated cleanup log.

mod cleanup;
mod error;
mod events;
mod guard;
mod interrupt;
mod process;
mod report;
mod scope;
mod server;
mod tasks;
mod transport;

pub use cleanup::{
    CleanupCoordinator, DEFAULT_KILL_WAIT, DEFAULT_SHUTDOWN_TIMEOUT, TerminationOutcome,
};
pub use error::LifecycleError;
pub use events::{CleanupPhase, LifecycleEvent, LifecycleEvents, NoLifecycleEvents};
pub use interrupt::{
    InterruptHandler, InterruptMode, InterruptTrigger, PollingInterrupt, SignalInterrupt,
};
pub use process::{ChildProcess, ManagedProcess, ProcessPipes};
pub use report::{BatchFailure, BatchReport, ShutdownReport};
pub use scope::{EventLoopScope, ScopeHandle, ScopeOutcome};
pub use server::{LifecycleSettings, ServerLifecycleManager, supervise_process};
pub use tasks::TaskRegistry;
pub use transport::{CloseOutcome, DEFAULT_CLEANUP_TIMEOUT, ManagedTransport, TransportManager};

/// `tracing` target of every lifecycle log line.
pub const LOG_TARGET: &str = module_path!();
