//! Hand-written port doubles shared by the use case tests.

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::llm_gateway::{ChatRequest, ChatResponse, GatewayError, LlmGateway};
use crate::ports::tool_server::{ToolServerError, ToolServerPort};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use toolrouter_domain::{ServerCatalog, ServerSpec, ToolDescriptor, ToolInvocation, ToolOutput};

pub(crate) fn catalog() -> ServerCatalog {
    ServerCatalog::new()
        .register(ServerSpec::new("filesystem", "npx", "Read and write local files"))
        .register(ServerSpec::new("brave-search", "npx", "Search the web"))
}

/// Replies are consumed in order; every request is recorded.
pub(crate) struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<ChatResponse, GatewayError>>>,
    pub(crate) requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedGateway {
    pub(crate) fn new(replies: Vec<Result<ChatResponse, GatewayError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(ChatResponse::text(*t))).collect())
    }

    pub(crate) fn request(&self, index: usize) -> ChatRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ChatResponse::text("(default response)")))
    }
}

/// Tool servers answering from a fixed table of `tool name -> output`.
pub(crate) struct MockToolServers {
    tools: HashMap<String, Vec<ToolDescriptor>>,
    outputs: HashMap<String, Result<ToolOutput, String>>,
    pub(crate) calls: Mutex<Vec<(String, String)>>,
}

impl MockToolServers {
    pub(crate) fn new() -> Self {
        let mut tools = HashMap::new();
        tools.insert(
            "filesystem".to_string(),
            vec![
                ToolDescriptor::new("list_directory", "List a directory"),
                ToolDescriptor::new("read_file", "Read a file"),
            ],
        );
        Self {
            tools,
            outputs: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_output(mut self, tool: &str, output: ToolOutput) -> Self {
        self.outputs.insert(tool.to_string(), Ok(output));
        self
    }

    pub(crate) fn with_failure(mut self, tool: &str, message: &str) -> Self {
        self.outputs.insert(tool.to_string(), Err(message.to_string()));
        self
    }

    pub(crate) fn called_tools(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, tool)| tool.clone())
            .collect()
    }
}

#[async_trait]
impl ToolServerPort for MockToolServers {
    fn servers(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, ToolServerError> {
        self.tools
            .get(server)
            .cloned()
            .ok_or_else(|| ToolServerError::NotRunning(server.to_string()))
    }

    async fn call_tool(
        &self,
        server: &str,
        invocation: &ToolInvocation,
    ) -> Result<ToolOutput, ToolServerError> {
        self.calls
            .lock()
            .unwrap()
            .push((server.to_string(), invocation.name.clone()));
        match self.outputs.get(&invocation.name) {
            Some(Ok(output)) => Ok(output.clone()),
            Some(Err(message)) => Err(ToolServerError::Remote {
                server: server.to_string(),
                message: message.clone(),
            }),
            None => Ok(ToolOutput::text(&invocation.name, "ok")),
        }
    }
}

/// Records event types in order.
#[derive(Default)]
pub(crate) struct RecordingLogger {
    pub(crate) events: Mutex<Vec<&'static str>>,
}

impl ConversationLogger for RecordingLogger {
    fn log(&self, event: ConversationEvent) {
        self.events.lock().unwrap().push(event.event_type);
    }
}
