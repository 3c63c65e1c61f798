//! Routing parameters for the request use cases.
//!
//! [`RoutingParams`] groups the static parameters used by
//! [`HandleRequestUseCase`](crate::use_cases::handle_request::HandleRequestUseCase).
//! They are application-layer concerns, resolved from file config by the
//! composition root.

use serde::{Deserialize, Serialize};
use toolrouter_domain::Model;

/// Models and limits for one routed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingParams {
    /// Model that picks the tool server.
    pub routing_model: Model,
    /// Model that calls the chosen server's tools and writes the answer.
    pub execution_model: Model,
    /// Upper bound on tool calls executed for a single request.
    pub max_tool_calls: usize,
}

impl Default for RoutingParams {
    fn default() -> Self {
        Self {
            routing_model: Model::default(),
            execution_model: Model::default(),
            max_tool_calls: 4,
        }
    }
}

impl RoutingParams {
    pub fn with_routing_model(mut self, model: Model) -> Self {
        self.routing_model = model;
        self
    }

    pub fn with_execution_model(mut self, model: Model) -> Self {
        self.execution_model = model;
        self
    }

    pub fn with_max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = RoutingParams::default();
        assert_eq!(params.max_tool_calls, 4);
        assert_eq!(params.routing_model.to_string(), "openai/gpt-4-0125-preview");
        assert_eq!(params.routing_model, params.execution_model);
    }

    #[test]
    fn test_builder() {
        let model: Model = "openai/gpt-4o-mini".parse().unwrap();
        let params = RoutingParams::default()
            .with_routing_model(model.clone())
            .with_max_tool_calls(1);
        assert_eq!(params.routing_model, model);
        assert_eq!(params.max_tool_calls, 1);
    }
}
