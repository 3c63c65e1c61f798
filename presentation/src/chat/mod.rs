//! Interactive prompt
//!
//! Provides a readline-based loop that hands each line to the request
//! handler.

mod reader;
mod repl;

pub use repl::{ChatRepl, ReplExit};
