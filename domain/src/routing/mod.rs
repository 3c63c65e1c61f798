//! Routing decisions
//!
//! The router model answers with a bare server name or `none`. Models are
//! not always obedient about "no quotes, no explanation", so the raw reply is
//! normalized before it is matched against the catalog.

use crate::server::entities::ServerCatalog;

/// Reply the router must give when no server fits.
pub const NO_TOOL: &str = "none";

/// Outcome of a routing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// No server can handle the request
    NoTool,
    /// Canonical name of the chosen server
    Server(String),
    /// The model named something that is not in the catalog
    Unrecognized(String),
}

impl RouteDecision {
    pub fn server(&self) -> Option<&str> {
        match self {
            RouteDecision::Server(name) => Some(name),
            _ => None,
        }
    }

    /// Acknowledgement appended to the transcript after routing.
    pub fn acknowledgement(&self) -> String {
        match self {
            RouteDecision::NoTool => {
                "I need more information. Could you please clarify?".to_string()
            }
            RouteDecision::Server(name) => format!("Using {} to help you...", name),
            RouteDecision::Unrecognized(name) => {
                format!("No tool server named '{}' is available.", name)
            }
        }
    }
}

/// Strip whitespace, wrapping quotes/backticks and a trailing period, then
/// lowercase.
fn normalize(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .trim_end_matches('.')
        .trim();
    trimmed.to_lowercase()
}

/// Interpret the router model's reply against the configured servers.
pub fn parse_route_decision(raw: &str, catalog: &ServerCatalog) -> RouteDecision {
    let name = normalize(raw);

    if name.is_empty() || name == NO_TOOL {
        return RouteDecision::NoTool;
    }

    match catalog.find_ignore_case(&name) {
        Some(spec) => RouteDecision::Server(spec.name.clone()),
        None => RouteDecision::Unrecognized(name),
    }
}
