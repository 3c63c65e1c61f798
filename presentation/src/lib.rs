//! Presentation layer for toolrouter
//!
//! This crate contains the CLI definition, the console formatter,
//! progress reporters and the interactive prompt.

pub mod chat;
pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use chat::{ChatRepl, ReplExit};
pub use cli::commands::{Cli, InterruptChoice};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
