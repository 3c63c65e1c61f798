//! Tool value objects

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload returned by a tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ToolPayload {
    Text(String),
    Structured(Value),
}

/// Result of running a tool (Value Object)
///
/// `is_error` mirrors the server's own verdict: the call reached the tool
/// but the tool reported a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_name: String,
    pub payload: ToolPayload,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(tool_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            payload: ToolPayload::Text(text.into()),
            is_error: false,
        }
    }

    pub fn structured(tool_name: impl Into<String>, value: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            payload: ToolPayload::Structured(value),
            is_error: false,
        }
    }

    pub fn error(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            payload: ToolPayload::Text(message.into()),
            is_error: true,
        }
    }

    /// Render the payload as text for the transcript.
    pub fn as_text(&self) -> String {
        match &self.payload {
            ToolPayload::Text(text) => text.clone(),
            ToolPayload::Structured(value) => value.to_string(),
        }
    }
}

impl std::fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_error {
            write!(f, "[{} failed] {}", self.tool_name, self.as_text())
        } else {
            write!(f, "{}", self.as_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_output() {
        let output = ToolOutput::text("list_directory", "[FILE] a.txt");
        assert!(!output.is_error);
        assert_eq!(output.to_string(), "[FILE] a.txt");
    }

    #[test]
    fn test_structured_output_renders_json() {
        let output = ToolOutput::structured("search", json!({"hits": 2}));
        assert_eq!(output.as_text(), r#"{"hits":2}"#);
    }

    #[test]
    fn test_error_output_display() {
        let output = ToolOutput::error("read_file", "no such file");
        assert!(output.is_error);
        assert_eq!(output.to_string(), "[read_file failed] no such file");
    }
}
