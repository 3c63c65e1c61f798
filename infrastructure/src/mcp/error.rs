//! Error types for the MCP client

use crate::lifecycle::LifecycleError;
use thiserror::Error;
use toolrouter_application::ToolServerError;

/// Result type alias for MCP operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur when talking to an MCP server
#[derive(Error, Debug)]
pub enum McpError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("JSON-RPC error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected response to {method}: {detail}")]
    UnexpectedResponse { method: String, detail: String },

    #[error("Request {method} timed out")]
    Timeout { method: String },

    #[error("Connection to '{0}' is closed")]
    Closed(String),
}

impl McpError {
    /// Map onto the application's error for `server`.
    pub fn into_tool_server_error(self, server: &str) -> ToolServerError {
        match self {
            McpError::Timeout { method } => ToolServerError::Timeout {
                server: server.to_string(),
                method,
            },
            McpError::Closed(_) => ToolServerError::NotRunning(server.to_string()),
            McpError::Rpc { message, .. } => ToolServerError::Remote {
                server: server.to_string(),
                message,
            },
            other => ToolServerError::Protocol(other.to_string()),
        }
    }
}
