//! Handle Request use case.
//!
//! One full routing cycle for a user message: route once, execute on the
//! chosen server if there is one, and return the resulting transcript.
//! There is no automatic re-routing after execution.

use crate::config::RoutingParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::llm_gateway::{GatewayError, LlmGateway};
use crate::ports::progress::RequestProgress;
use crate::ports::tool_server::ToolServerPort;
use crate::use_cases::execute_tool::ExecuteToolUseCase;
use crate::use_cases::route_request::RouteRequestUseCase;
use std::sync::Arc;
use thiserror::Error;
use toolrouter_domain::util::preview;
use toolrouter_domain::{ConversationState, PromptTemplate, RouteDecision, ServerCatalog};
use tracing::info;

/// Errors that abort a request before any answer is produced.
#[derive(Error, Debug)]
pub enum HandleRequestError {
    #[error("Empty request")]
    EmptyInput,

    #[error("Routing failed: {0}")]
    Routing(#[from] GatewayError),
}

/// Result of handling one request.
#[derive(Debug, Clone)]
pub struct HandleRequestOutput {
    pub decision: RouteDecision,
    pub state: ConversationState,
}

impl HandleRequestOutput {
    /// Text shown to the user.
    pub fn answer(&self) -> &str {
        self.state.final_answer().unwrap_or_default()
    }
}

/// Use case wiring routing and execution together.
#[derive(Clone)]
pub struct HandleRequestUseCase {
    route: RouteRequestUseCase,
    execute: ExecuteToolUseCase,
    params: RoutingParams,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl HandleRequestUseCase {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        tool_servers: Arc<dyn ToolServerPort>,
        catalog: Arc<ServerCatalog>,
        prompts: Arc<PromptTemplate>,
        params: RoutingParams,
    ) -> Self {
        Self {
            route: RouteRequestUseCase::new(gateway.clone(), catalog.clone(), prompts.clone()),
            execute: ExecuteToolUseCase::new(gateway, tool_servers, catalog, prompts),
            params,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Attach a conversation logger to this and the inner use cases.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.route = self.route.with_conversation_logger(logger.clone());
        self.execute = self.execute.with_conversation_logger(logger.clone());
        self.conversation_logger = logger;
        self
    }

    pub fn params(&self) -> &RoutingParams {
        &self.params
    }

    pub async fn execute(
        &self,
        input: &str,
        progress: &dyn RequestProgress,
    ) -> Result<HandleRequestOutput, HandleRequestError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(HandleRequestError::EmptyInput);
        }

        info!("Handling request: {}", preview(input, 100));
        self.conversation_logger.log(ConversationEvent::new(
            "request",
            serde_json::json!({ "input": input }),
        ));

        let mut state = ConversationState::new(input);
        let decision = self
            .route
            .execute(&mut state, &self.params.routing_model, progress)
            .await?;

        if decision.server().is_some() {
            self.execute
                .execute(
                    &mut state,
                    &self.params.execution_model,
                    self.params.max_tool_calls,
                    progress,
                )
                .await;
        }

        self.conversation_logger.log(ConversationEvent::new(
            "response",
            serde_json::json!({
                "answer": state.final_answer(),
                "errors": state.error_messages,
            }),
        ));
        progress.on_finished();

        Ok(HandleRequestOutput { decision, state })
    }
}
