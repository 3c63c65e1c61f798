//! Tool server domain module
//!
//! A tool server is an external subprocess exposing callable operations
//! (file I/O, web search, browser automation, reasoning) behind the MCP
//! request/response protocol. This module only describes servers; launching
//! and supervising them is an infrastructure concern.

pub mod entities;

pub use entities::{ServerCatalog, ServerSpec};
