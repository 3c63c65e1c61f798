//! Conversation domain module
//!
//! The transcript of one user request: the human message, the router's
//! acknowledgement, the execution model's tool calls, tool results and the
//! final answer, plus the outputs and errors collected along the way.

pub mod entities;

pub use entities::{ConversationState, Message, Role};
