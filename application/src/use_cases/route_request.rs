//! Route Request use case.
//!
//! Asks the routing model which tool server should handle the latest user
//! message and records the decision in the conversation state.

use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::llm_gateway::{ChatRequest, GatewayError, LlmGateway};
use crate::ports::progress::RequestProgress;
use std::sync::Arc;
use toolrouter_domain::util::preview;
use toolrouter_domain::{
    ConversationState, Message, Model, PromptTemplate, RouteDecision, ServerCatalog,
    parse_route_decision,
};
use tracing::{debug, info, warn};

/// Use case for choosing a tool server.
#[derive(Clone)]
pub struct RouteRequestUseCase {
    gateway: Arc<dyn LlmGateway>,
    catalog: Arc<ServerCatalog>,
    prompts: Arc<PromptTemplate>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl RouteRequestUseCase {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        catalog: Arc<ServerCatalog>,
        prompts: Arc<PromptTemplate>,
    ) -> Self {
        Self {
            gateway,
            catalog,
            prompts,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Route the latest user message.
    ///
    /// Appends the acknowledgement message and sets `current_server` when a
    /// known server was chosen. An unknown name is recorded as an error.
    pub async fn execute(
        &self,
        state: &mut ConversationState,
        model: &Model,
        progress: &dyn RequestProgress,
    ) -> Result<RouteDecision, GatewayError> {
        let input = state.last_user_text().unwrap_or_default().to_string();
        progress.on_routing_start();

        let system = self.prompts.router_system(&self.catalog.format_descriptions());
        let request = ChatRequest::new(
            model.clone(),
            vec![Message::system(system), Message::user(&input)],
        );

        debug!("Routing with {}: {}", model, preview(&input, 100));
        let reply = self.gateway.chat(request).await?;
        let decision = parse_route_decision(&reply.content, &self.catalog);

        match &decision {
            RouteDecision::Server(name) => info!("Routed request to '{}'", name),
            RouteDecision::NoTool => info!("Router found no suitable tool server"),
            RouteDecision::Unrecognized(name) => {
                warn!("Router chose unknown tool server '{}'", name);
                state.record_error(format!("Unknown tool server: {}", name));
            }
        }

        state.push(Message::assistant(decision.acknowledgement()));
        state.current_server = decision.server().map(str::to_string);

        self.conversation_logger.log(ConversationEvent::new(
            "route_decision",
            serde_json::json!({
                "model": model.to_string(),
                "raw": reply.content,
                "server": decision.server(),
            }),
        ));
        progress.on_route_decided(&decision);

        Ok(decision)
    }
}
