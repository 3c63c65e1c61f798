//! Chat completions wire types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use toolrouter_application::{ChatRequest, ChatResponse, GatewayError};
use toolrouter_domain::{Message, Role, ToolDescriptor, ToolInvocation};

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
    pub fn from_chat(request: &ChatRequest, temperature: Option<f32>) -> Self {
        let tools: Vec<WireTool> = request.tools.iter().map(WireTool::from).collect();
        let tool_choice = match (tools.is_empty(), request.tool_calls_allowed) {
            (true, _) => None,
            (false, true) => Some("auto"),
            (false, false) => Some("none"),
        };
        Self {
            model: request.model.name().to_string(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools,
            tool_choice,
            temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let tool_calls = if message.tool_calls.is_empty() {
            None
        } else {
            Some(message.tool_calls.iter().map(WireToolCall::from).collect())
        };
        // Assistant turns that only call tools carry no text
        let content = if message.role == Role::Assistant
            && tool_calls.is_some()
            && message.content.is_empty()
        {
            None
        } else {
            Some(message.content.clone())
        };
        Self {
            role: message.role.as_str().to_string(),
            content,
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    pub arguments: String,
}

impl From<&ToolInvocation> for WireToolCall {
    fn from(call: &ToolInvocation) -> Self {
        Self {
            id: call.call_id.clone(),
            call_type: function_type(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: Value::Object(call.arguments.clone()).to_string(),
            },
        }
    }
}

impl TryFrom<WireToolCall> for ToolInvocation {
    type Error = GatewayError;

    fn try_from(call: WireToolCall) -> Result<Self, Self::Error> {
        let raw = call.function.arguments.trim();
        let arguments = if raw.is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(GatewayError::InvalidResponse(format!(
                        "Arguments of {} are not an object: {}",
                        call.function.name, other
                    )));
                }
                Err(e) => {
                    return Err(GatewayError::InvalidResponse(format!(
                        "Arguments of {} are not valid JSON: {}",
                        call.function.name, e
                    )));
                }
            }
        };
        Ok(ToolInvocation::new(call.id, call.function.name).with_arguments(arguments))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: WireFunction,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<&ToolDescriptor> for WireTool {
    fn from(tool: &ToolDescriptor) -> Self {
        Self {
            tool_type: "function",
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: WireMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl ChatCompletionResponse {
    /// The first choice as a [`ChatResponse`].
    pub fn into_chat_response(self) -> Result<ChatResponse, GatewayError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::InvalidResponse("No choices in response".to_string()))?;

        let calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(ToolInvocation::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ChatResponse::text(choice.message.content.unwrap_or_default()).with_tool_calls(calls))
    }
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolrouter_domain::Model;

    fn request_with_tools(allowed: bool) -> ChatRequest {
        let request = ChatRequest::new(
            Model::default(),
            vec![Message::system("route"), Message::user("list files")],
        )
        .with_tools(vec![ToolDescriptor::new("list_directory", "List a directory")]);
        if allowed {
            request
        } else {
            request.without_tool_calls()
        }
    }

    #[test]
    fn test_plain_request_omits_tools() {
        let request = ChatRequest::new(Model::default(), vec![Message::user("hi")]);
        let json = serde_json::to_value(ChatCompletionRequest::from_chat(&request, None)).unwrap();

        assert_eq!(json["model"], "gpt-4-0125-preview");
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_tool_choice_follows_permission() {
        let auto = ChatCompletionRequest::from_chat(&request_with_tools(true), Some(0.0));
        assert_eq!(auto.tool_choice, Some("auto"));
        assert_eq!(auto.tools[0].function.name, "list_directory");

        let none = ChatCompletionRequest::from_chat(&request_with_tools(false), None);
        assert_eq!(none.tool_choice, Some("none"));
    }

    #[test]
    fn test_transcript_with_tool_round_trip_serializes() {
        let call = ToolInvocation::new("call_1", "list_directory").with_arg("path", ".");
        let messages = [
            Message::assistant_with_calls("", vec![call]),
            Message::tool("call_1", "[FILE] a.txt"),
        ];
        let wire: Vec<WireMessage> = messages.iter().map(WireMessage::from).collect();
        let json = serde_json::to_value(&wire).unwrap();

        assert!(json[0]["content"].is_null());
        assert_eq!(json[0]["tool_calls"][0]["type"], "function");
        assert_eq!(
            json[0]["tool_calls"][0]["function"]["arguments"],
            r#"{"path":"."}"#
        );
        assert_eq!(json[1]["role"], "tool");
        assert_eq!(json[1]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "read_file", "arguments": "{\"path\":\"a.txt\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let chat = response.into_chat_response().unwrap();
        assert_eq!(chat.content, "");
        assert_eq!(chat.tool_calls[0].call_id, "call_9");
        assert_eq!(chat.tool_calls[0].get_string("path"), Some("a.txt"));
    }

    #[test]
    fn test_invalid_arguments_are_rejected() {
        let call = WireToolCall {
            id: "call_1".to_string(),
            call_type: function_type(),
            function: WireFunctionCall {
                name: "read_file".to_string(),
                arguments: "[1, 2]".to_string(),
            },
        };
        assert!(matches!(
            ToolInvocation::try_from(call),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_empty_choices_is_invalid() {
        let response = ChatCompletionResponse { choices: vec![] };
        assert!(response.into_chat_response().is_err());
    }
}
