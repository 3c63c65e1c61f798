//! Domain layer for toolrouter
//!
//! This crate contains the core business types: tool servers and their
//! descriptions, tool descriptors and invocations, the conversation
//! transcript, and routing decisions. It has no dependencies on
//! infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tool servers
//!
//! A tool server is an external subprocess (an MCP server) providing a set of
//! callable operations behind a uniform request/response protocol. The
//! [`ServerCatalog`] lists the configured servers with the text description
//! the router model chooses from.
//!
//! ## Routing
//!
//! Each user request is routed to at most one server ([`RouteDecision`]).
//! The chosen server's tools are then offered to the execution model.

pub mod conversation;
pub mod core;
pub mod prompt;
pub mod routing;
pub mod server;
pub mod tool;
pub mod util;

// Re-export commonly used types
pub use conversation::entities::{ConversationState, Message, Role};
pub use core::{error::DomainError, model::Model};
pub use prompt::{PromptOverrides, PromptTemplate};
pub use routing::{RouteDecision, parse_route_decision};
pub use server::entities::{ServerCatalog, ServerSpec};
pub use tool::{
    entities::{ToolDescriptor, ToolInvocation},
    value_objects::ToolOutput,
};
