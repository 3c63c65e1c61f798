//! MCP stdio client
//!
//! Tool servers are spoken to with newline-delimited JSON-RPC 2.0 over the
//! child's stdin and stdout. [`McpConnection`] is one such session and is
//! tracked by the lifecycle layer as a transport; [`McpToolServers`] exposes
//! the open connections through the application's tool server port.

mod connection;
pub mod error;
mod launcher;
mod pool;
pub mod protocol;

pub use connection::{DEFAULT_REQUEST_TIMEOUT, McpConnection};
pub use error::McpError;
pub use launcher::ServerLauncher;
pub use pool::McpToolServers;
