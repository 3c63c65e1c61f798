//! Port for structured conversation logging.
//!
//! Records the steps of each routed request (the request, the routing
//! decision, tool calls and results, the final response, errors) as
//! machine-readable events. `tracing` output stays the human-readable
//! diagnostic channel.

use serde_json::Value;

/// A structured conversation event.
pub struct ConversationEvent {
    /// Event type identifier (`request`, `route_decision`, `tool_call`,
    /// `tool_result`, `response`, `error`).
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging conversation events.
///
/// `log` is synchronous and infallible: a failed write must never abort the
/// request being logged.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
