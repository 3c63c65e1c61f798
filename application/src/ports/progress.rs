//! Progress notification port
//!
//! Defines the callbacks fired while a request is routed and executed.

use toolrouter_domain::RouteDecision;

/// Callback for progress updates during request handling
///
/// Implementations live in the presentation layer (spinner, plain log, ...).
pub trait RequestProgress: Send + Sync {
    /// Called before the router model is asked
    fn on_routing_start(&self);

    /// Called once the router's reply has been interpreted
    fn on_route_decided(&self, decision: &RouteDecision);

    /// Called before a tool call is sent to its server
    fn on_tool_call_start(&self, _server: &str, _tool: &str) {}

    /// Called after a tool call finished (or failed)
    fn on_tool_call_complete(&self, _tool: &str, _success: bool) {}

    /// Called when the request has been fully handled
    fn on_finished(&self) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl RequestProgress for NoProgress {
    fn on_routing_start(&self) {}
    fn on_route_decided(&self, _decision: &RouteDecision) {}
}
