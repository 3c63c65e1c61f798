//! Tool server port
//!
//! The application sees tool servers only through their two operations:
//! list the tools a server offers (`GetTools`) and run one of them
//! (`RunTool`). How servers are launched and spoken to is an infrastructure
//! concern.

use async_trait::async_trait;
use thiserror::Error;
use toolrouter_domain::{ToolDescriptor, ToolInvocation, ToolOutput};

/// Errors raised while talking to a tool server
#[derive(Error, Debug)]
pub enum ToolServerError {
    #[error("Unknown tool server: {0}")]
    UnknownServer(String),

    #[error("Tool server '{0}' is not running")]
    NotRunning(String),

    #[error("Tool server '{server}' timed out on {method}")]
    Timeout { server: String, method: String },

    #[error("Tool server '{server}' returned an error: {message}")]
    Remote { server: String, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Port for listing and calling tools on a named server
#[async_trait]
pub trait ToolServerPort: Send + Sync {
    /// Names of the servers currently reachable
    fn servers(&self) -> Vec<String>;

    /// Tools offered by `server`
    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, ToolServerError>;

    /// Run one tool on `server`
    ///
    /// A tool that ran and reported failure is `Ok` with `is_error` set;
    /// `Err` means the call never completed.
    async fn call_tool(
        &self,
        server: &str,
        invocation: &ToolInvocation,
    ) -> Result<ToolOutput, ToolServerError>;
}
