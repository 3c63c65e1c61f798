//! Application layer for toolrouter
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::RoutingParams;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    interrupt::{InterruptPort, NoInterrupt},
    llm_gateway::{ChatRequest, ChatResponse, GatewayError, LlmGateway},
    progress::{NoProgress, RequestProgress},
    tool_server::{ToolServerError, ToolServerPort},
};
pub use use_cases::execute_tool::{ExecuteToolError, ExecuteToolUseCase};
pub use use_cases::handle_request::{
    HandleRequestError, HandleRequestOutput, HandleRequestUseCase,
};
pub use use_cases::route_request::RouteRequestUseCase;
