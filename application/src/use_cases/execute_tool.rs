//! Execute Tool use case.
//!
//! Runs the execution model against the server chosen by the router:
//!
//! 1. Fetch the server's tools (`GetTools`)
//! 2. Ask the execution model, offering those tools
//! 3. Run the requested calls one after another (`RunTool`), capped by
//!    [`RoutingParams::max_tool_calls`](crate::config::RoutingParams)
//! 4. Ask once more, without tool calls, for the final answer
//!
//! Failures never escape: they are appended to the transcript and to
//! `error_messages`, and the routing cycle ends.

use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::llm_gateway::{ChatRequest, GatewayError, LlmGateway};
use crate::ports::progress::RequestProgress;
use crate::ports::tool_server::{ToolServerError, ToolServerPort};
use std::sync::Arc;
use thiserror::Error;
use toolrouter_domain::util::preview;
use toolrouter_domain::{
    ConversationState, DomainError, Message, Model, PromptTemplate, ServerCatalog,
    ToolDescriptor, ToolInvocation,
};
use tracing::{debug, info, warn};

/// Errors that end a tool execution step.
#[derive(Error, Debug)]
pub enum ExecuteToolError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    ToolServer(#[from] ToolServerError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Use case for executing tools on the routed server.
#[derive(Clone)]
pub struct ExecuteToolUseCase {
    gateway: Arc<dyn LlmGateway>,
    tool_servers: Arc<dyn ToolServerPort>,
    catalog: Arc<ServerCatalog>,
    prompts: Arc<PromptTemplate>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl ExecuteToolUseCase {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        tool_servers: Arc<dyn ToolServerPort>,
        catalog: Arc<ServerCatalog>,
        prompts: Arc<PromptTemplate>,
    ) -> Self {
        Self {
            gateway,
            tool_servers,
            catalog,
            prompts,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Execute against `state.current_server`, which is cleared afterwards.
    pub async fn execute(
        &self,
        state: &mut ConversationState,
        model: &Model,
        max_tool_calls: usize,
        progress: &dyn RequestProgress,
    ) {
        let Some(server) = state.current_server.take() else {
            state.push(Message::assistant("No tool selected. Please try again."));
            state.record_error("No tool selected");
            return;
        };

        if let Err(e) = self
            .run(state, &server, model, max_tool_calls, progress)
            .await
        {
            let message = format!("Error executing tool: {}", e);
            warn!("{}", message);
            self.conversation_logger.log(ConversationEvent::new(
                "error",
                serde_json::json!({ "server": server, "message": message }),
            ));
            state.push(Message::assistant(&message));
            state.record_error(message);
        }
    }

    async fn run(
        &self,
        state: &mut ConversationState,
        server: &str,
        model: &Model,
        max_tool_calls: usize,
        progress: &dyn RequestProgress,
    ) -> Result<(), ExecuteToolError> {
        let spec = self
            .catalog
            .get(server)
            .ok_or_else(|| DomainError::UnknownServer(server.to_string()))?;
        let input = state.last_user_text().unwrap_or_default().to_string();

        let tools = self.tool_servers.list_tools(server).await?;
        debug!("Server '{}' offers {} tools", server, tools.len());

        let system = self.prompts.executor_system(
            &spec.description,
            &tool_names(&tools),
            &input,
            &chrono::Utc::now().to_rfc3339(),
        );
        let mut messages = vec![Message::system(system), Message::user(&input)];

        let response = self
            .gateway
            .chat(ChatRequest::new(model.clone(), messages.clone()).with_tools(tools.clone()))
            .await?;

        if !response.has_tool_calls() {
            state.record_tool_output(&response.content);
            state.push(response.into_message());
            return Ok(());
        }

        let assistant = response.into_message();
        let calls = assistant.tool_calls.clone();
        messages.push(assistant.clone());
        state.push(assistant);

        if calls.len() > max_tool_calls {
            warn!(
                "Model requested {} tool calls, executing the first {}",
                calls.len(),
                max_tool_calls
            );
        }

        let mut failures = Vec::new();
        for (index, call) in calls.iter().enumerate() {
            let result = if index < max_tool_calls {
                self.call_tool(state, server, call, progress, &mut failures)
                    .await
            } else {
                Message::tool(&call.call_id, "Skipped: tool call limit reached")
            };
            messages.push(result.clone());
            state.push(result);
        }

        if !failures.is_empty() {
            messages.push(Message::system(
                self.prompts.error_handling(&failures.join("\n")),
            ));
        }

        let follow_up = ChatRequest::new(model.clone(), messages)
            .with_tools(tools)
            .without_tool_calls();
        let answer = self.gateway.chat(follow_up).await?;
        state.push(Message::assistant(answer.content));

        Ok(())
    }

    /// Run one call and return the tool message answering it.
    async fn call_tool(
        &self,
        state: &mut ConversationState,
        server: &str,
        call: &ToolInvocation,
        progress: &dyn RequestProgress,
        failures: &mut Vec<String>,
    ) -> Message {
        info!("Calling {}/{}", server, call.name);
        progress.on_tool_call_start(server, &call.name);
        self.conversation_logger.log(ConversationEvent::new(
            "tool_call",
            serde_json::json!({
                "server": server,
                "tool": call.name,
                "arguments": call.arguments,
            }),
        ));

        let (content, success) = match self.tool_servers.call_tool(server, call).await {
            Ok(output) => {
                let rendered = output.to_string();
                if output.is_error {
                    failures.push(rendered.clone());
                    state.record_error(rendered.clone());
                }
                (rendered, !output.is_error)
            }
            Err(e) => {
                let message = format!("Error executing tool: {}", e);
                failures.push(message.clone());
                state.record_error(message.clone());
                (message, false)
            }
        };

        debug!("{} -> {}", call.name, preview(&content, 200));
        self.conversation_logger.log(ConversationEvent::new(
            "tool_result",
            serde_json::json!({
                "tool": call.name,
                "success": success,
                "output": content,
            }),
        ));
        progress.on_tool_call_complete(&call.name, success);

        state.record_tool_output(&content);
        Message::tool(&call.call_id, content)
    }
}

fn tool_names(tools: &[ToolDescriptor]) -> String {
    tools
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
