//! Conversation domain entities

use crate::tool::entities::ToolInvocation;
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message in a conversation (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Tool calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
    /// For `Role::Tool`: the call this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Assistant message that requests tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolInvocation>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::with_role(Role::Assistant, content)
        }
    }

    /// Tool result answering `call_id`.
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// State of one routed request (Entity)
///
/// `tool_outputs` and `error_messages` only ever grow: each step appends to
/// what earlier steps recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub current_server: Option<String>,
    pub tool_outputs: Vec<String>,
    pub error_messages: Vec<String>,
}

impl ConversationState {
    /// Start a transcript from the user's request.
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(user_input)],
            ..Default::default()
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn record_tool_output(&mut self, output: impl Into<String>) {
        self.tool_outputs.push(output.into());
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.error_messages.push(error.into());
    }

    /// Text of the most recent user message.
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Everything after the initial human message.
    pub fn responses(&self) -> &[Message] {
        self.messages.get(1..).unwrap_or(&[])
    }

    /// The last assistant message without pending tool calls.
    pub fn final_answer(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.has_tool_calls())
            .map(|m| m.content.as_str())
    }

    pub fn has_errors(&self) -> bool {
        !self.error_messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_has_user_message() {
        let state = ConversationState::new("list files");
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.last_user_text(), Some("list files"));
        assert!(state.responses().is_empty());
        assert!(state.current_server.is_none());
    }

    #[test]
    fn test_outputs_and_errors_accumulate() {
        let mut state = ConversationState::new("q");
        state.record_tool_output("first");
        state.record_tool_output("second");
        state.record_error("boom");
        assert_eq!(state.tool_outputs, vec!["first", "second"]);
        assert!(state.has_errors());
    }

    #[test]
    fn test_final_answer_skips_tool_call_messages() {
        let mut state = ConversationState::new("q");
        state.push(Message::assistant("Using filesystem to help you..."));
        state.push(Message::assistant_with_calls(
            "",
            vec![ToolInvocation::new("c1", "list_directory")],
        ));
        state.push(Message::tool("c1", "[FILE] a"));
        assert_eq!(
            state.final_answer(),
            Some("Using filesystem to help you...")
        );

        state.push(Message::assistant("There is one file."));
        assert_eq!(state.final_answer(), Some("There is one file."));
        assert_eq!(state.responses().len(), 4);
    }

    #[test]
    fn test_tool_message_carries_call_id() {
        let msg = Message::tool("call_9", "out");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_9"));
    }
}
