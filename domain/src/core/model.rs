//! Model value object identifying an LLM by provider and name

use super::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Provider assumed when a model id carries no `provider/` prefix.
pub const DEFAULT_PROVIDER: &str = "openai";

/// Model used for both routing and execution unless configured otherwise.
pub const DEFAULT_MODEL: &str = "gpt-4-0125-preview";

/// An LLM model id (Value Object)
///
/// Written as `provider/name` (e.g. `openai/gpt-4o`). A bare name is
/// attributed to [`DEFAULT_PROVIDER`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Model {
    provider: String,
    name: String,
}

impl Model {
    pub fn new(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            name: name.into(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check that the provider is one this build can talk to.
    pub fn ensure_supported(&self) -> Result<(), DomainError> {
        if self.provider == DEFAULT_PROVIDER {
            Ok(())
        } else {
            Err(DomainError::UnsupportedProvider(self.provider.clone()))
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER, DEFAULT_MODEL)
    }
}

impl FromStr for Model {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (provider, name) = match s.split_once('/') {
            Some((provider, name)) => (provider.trim(), name.trim()),
            None => (DEFAULT_PROVIDER, s),
        };

        if provider.is_empty() || name.is_empty() || name.contains('/') {
            return Err(DomainError::InvalidModel(s.to_string()));
        }

        Ok(Self::new(provider.to_lowercase(), name))
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.name)
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
