//! Error types for process and transport lifecycle management

use std::any::Any;
use thiserror::Error;

/// Errors raised by individual lifecycle operations.
///
/// Batch operations (cleanup, shutdown) never return these directly; they
/// collect them into a [`BatchReport`](super::report::BatchReport).
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Empty command line for server '{0}'")]
    EmptyCommand(String),

    #[error("Command '{command}' for server '{name}' was not found on PATH")]
    CommandNotFound { name: String, command: String },

    #[error("Failed to spawn server '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server '{name}' did not provide its {pipe} pipe")]
    MissingPipe { name: String, pipe: &'static str },

    #[error("Failed to signal process '{name}': {source}")]
    Signal {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to close transport '{label}': {source}")]
    TransportClose {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No async runtime available to schedule '{0}'")]
    NoRuntime(String),

    #[error("Task panicked: {0}")]
    Panicked(String),
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
