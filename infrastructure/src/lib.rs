//! Infrastructure layer for toolrouter
//!
//! This crate contains the adapters behind the application ports: the tool
//! server process lifecycle, the MCP stdio client, the OpenAI chat gateway,
//! configuration file loading and the JSONL conversation log.

pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod mcp;
pub mod openai;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use lifecycle::{
    EventLoopScope, InterruptMode, LifecycleError, LifecycleSettings, ScopeHandle, ScopeOutcome,
    ServerLifecycleManager, ShutdownReport,
};
pub use logging::JsonlConversationLogger;
pub use mcp::{McpError, McpToolServers, ServerLauncher};
pub use openai::{OpenAiGateway, OpenAiSettings};
