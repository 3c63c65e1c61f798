//! Model selection from TOML (`[models]` section)

use super::ConfigValidationError;
use serde::{Deserialize, Serialize};
use toolrouter_domain::Model;

/// Model selection from TOML
///
/// # Example
///
/// ```toml
/// [models]
/// routing = "openai/gpt-4-0125-preview"    # Picks the tool server
/// execution = "openai/gpt-4o"              # Calls the chosen server's tools
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    pub routing: String,
    pub execution: String,
}

impl Default for FileModelsConfig {
    fn default() -> Self {
        let model = Model::default().to_string();
        Self {
            routing: model.clone(),
            execution: model,
        }
    }
}

impl FileModelsConfig {
    fn parse(field: &'static str, value: &str) -> Result<Model, ConfigValidationError> {
        if value.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName { field });
        }
        let model: Model = value
            .parse()
            .map_err(|e: toolrouter_domain::DomainError| ConfigValidationError::InvalidModel {
                field,
                reason: e.to_string(),
            })?;
        model
            .ensure_supported()
            .map_err(|e| ConfigValidationError::InvalidModel {
                field,
                reason: e.to_string(),
            })?;
        Ok(model)
    }

    pub fn parse_routing(&self) -> Result<Model, ConfigValidationError> {
        Self::parse("routing", &self.routing)
    }

    pub fn parse_execution(&self) -> Result<Model, ConfigValidationError> {
        Self::parse("execution", &self.execution)
    }
}
