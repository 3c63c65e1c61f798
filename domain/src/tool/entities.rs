//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool offered by a tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name within its server (e.g., "list_directory")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema of the arguments object
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Names of the required arguments declared by the schema.
    pub fn required_arguments(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }

    /// One-line summary used in prompts: `name: description`.
    pub fn summary(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.description)
        }
    }
}

/// A request from the execution model to run one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Correlates the model's request with the tool result message
    pub call_id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(call_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Arguments missing relative to the descriptor's `required` list.
    pub fn missing_arguments<'a>(&self, descriptor: &'a ToolDescriptor) -> Vec<&'a str> {
        descriptor
            .required_arguments()
            .into_iter()
            .filter(|name| !self.arguments.contains_key(*name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list_directory() -> ToolDescriptor {
        ToolDescriptor::new("list_directory", "List a directory").with_schema(json!({
            "type": "object",
            "properties": {"path": {"type": "string"}},
            "required": ["path"]
        }))
    }

    #[test]
    fn test_required_arguments() {
        assert_eq!(list_directory().required_arguments(), vec!["path"]);
        assert!(ToolDescriptor::new("x", "y").required_arguments().is_empty());
    }

    #[test]
    fn test_missing_arguments() {
        let descriptor = list_directory();
        let call = ToolInvocation::new("call_1", "list_directory");
        assert_eq!(call.missing_arguments(&descriptor), vec!["path"]);

        let call = call.with_arg("path", ".");
        assert!(call.missing_arguments(&descriptor).is_empty());
        assert_eq!(call.get_string("path"), Some("."));
    }

    #[test]
    fn test_summary() {
        assert_eq!(list_directory().summary(), "list_directory: List a directory");
        assert_eq!(ToolDescriptor::new("ping", "").summary(), "ping");
    }
}
