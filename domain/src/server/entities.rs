//! Tool server entities

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Launch description of a single tool server (Entity)
///
/// The `name` is the unique key used by the router, the process registry
/// and the MCP connection pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSpec {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    /// Variables overlaid on the ambient process environment.
    pub env: BTreeMap<String, String>,
    /// What the router model reads when choosing a server.
    pub description: String,
}

impl ServerSpec {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            description: description.into(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Full argv: the command followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.command.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let invalid = |reason: &str| DomainError::InvalidServer {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if self.name.eq_ignore_ascii_case("none") {
            return Err(invalid("'none' is reserved for the router"));
        }
        if self.command.trim().is_empty() {
            return Err(invalid("command cannot be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(invalid("description cannot be empty"));
        }
        Ok(())
    }
}

/// The set of configured tool servers, in a stable order
#[derive(Debug, Clone, Default)]
pub struct ServerCatalog {
    servers: Vec<ServerSpec>,
}

impl ServerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server, replacing any previous entry with the same name.
    pub fn register(mut self, spec: ServerSpec) -> Self {
        self.servers.retain(|s| s.name != spec.name);
        self.servers.push(spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ServerSpec> {
        self.servers.iter().find(|s| s.name == name)
    }

    /// Case-insensitive lookup, returning the canonical spec.
    pub fn find_ignore_case(&self, name: &str) -> Option<&ServerSpec> {
        self.servers
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerSpec> {
        self.servers.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.servers.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// `(name, description)` pairs in catalog order.
    pub fn descriptions(&self) -> Vec<(&str, &str)> {
        self.servers
            .iter()
            .map(|s| (s.name.as_str(), s.description.as_str()))
            .collect()
    }

    /// Bullet list used in the router prompt: `- name: description`.
    pub fn format_descriptions(&self) -> String {
        self.servers
            .iter()
            .map(|s| format!("- {}: {}", s.name, s.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<ServerSpec> for ServerCatalog {
    fn from_iter<I: IntoIterator<Item = ServerSpec>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ServerCatalog::new(), |catalog, spec| catalog.register(spec))
    }
}
