//! Raw TOML configuration data types
//!
//! These structs mirror the TOML file section by section. They are
//! deserialized directly and converted into domain and lifecycle types
//! once validated.

mod execution;
mod lifecycle;
mod llm;
mod logging;
mod models;
mod prompts;
mod servers;

pub use execution::FileExecutionConfig;
pub use lifecycle::FileLifecycleConfig;
pub use llm::FileLlmConfig;
pub use logging::FileLoggingConfig;
pub use models::FileModelsConfig;
pub use prompts::FilePromptsConfig;
pub use servers::{FileServerConfig, default_servers, expand_env};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use toolrouter_application::RoutingParams;
use toolrouter_domain::ServerCatalog;

/// A problem found while validating a [`FileConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("models.{field}: model name cannot be empty")]
    EmptyModelName { field: &'static str },

    #[error("models.{field}: {reason}")]
    InvalidModel { field: &'static str, reason: String },

    #[error("lifecycle.{field}: must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("execution.max_tool_calls: must be greater than zero")]
    ZeroMaxToolCalls,

    #[error("servers.{server}: {reason}")]
    InvalidServer { server: String, reason: String },

    #[error("no tool servers are enabled")]
    NoServers,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Routing and execution model selection
    pub models: FileModelsConfig,
    /// Chat completions endpoint
    pub llm: FileLlmConfig,
    /// Shutdown timeouts, interrupt mode and cleanup log
    pub lifecycle: FileLifecycleConfig,
    /// General session log file
    pub logging: FileLoggingConfig,
    /// Per-request limits
    pub execution: FileExecutionConfig,
    /// Prompt template overrides
    pub prompts: FilePromptsConfig,
    /// Tool servers keyed by name
    pub servers: BTreeMap<String, FileServerConfig>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            models: FileModelsConfig::default(),
            llm: FileLlmConfig::default(),
            lifecycle: FileLifecycleConfig::default(),
            logging: FileLoggingConfig::default(),
            execution: FileExecutionConfig::default(),
            prompts: FilePromptsConfig::default(),
            servers: default_servers(),
        }
    }
}

impl FileConfig {
    /// Validate the entire configuration, returning every detected problem.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = self.models.parse_routing() {
            errors.push(e);
        }
        if let Err(e) = self.models.parse_execution() {
            errors.push(e);
        }

        let lifecycle = &self.lifecycle;
        for (field, value) in [
            ("shutdown_timeout_ms", lifecycle.shutdown_timeout_ms),
            ("kill_wait_ms", lifecycle.kill_wait_ms),
            ("task_cancel_timeout_ms", lifecycle.task_cancel_timeout_ms),
            ("request_timeout_ms", lifecycle.request_timeout_ms),
        ] {
            if value == 0 {
                errors.push(ConfigValidationError::ZeroTimeout { field });
            }
        }

        if self.execution.max_tool_calls == 0 {
            errors.push(ConfigValidationError::ZeroMaxToolCalls);
        }

        let mut enabled = 0;
        for (name, server) in self.enabled_servers() {
            enabled += 1;
            if let Err(e) = server.to_spec(name).validate() {
                errors.push(ConfigValidationError::InvalidServer {
                    server: name.clone(),
                    reason: match e {
                        toolrouter_domain::DomainError::InvalidServer { reason, .. } => reason,
                        other => other.to_string(),
                    },
                });
            }
        }
        if enabled == 0 {
            errors.push(ConfigValidationError::NoServers);
        }

        errors
    }

    fn enabled_servers(&self) -> impl Iterator<Item = (&String, &FileServerConfig)> {
        self.servers.iter().filter(|(_, s)| s.enabled)
    }

    /// The enabled servers as launch specs, with `${VAR}` references expanded.
    pub fn catalog(&self) -> ServerCatalog {
        self.enabled_servers()
            .map(|(name, server)| server.to_spec(name))
            .collect::<ServerCatalog>()
    }

    /// Routing parameters; call after [`validate`](Self::validate) passed.
    pub fn routing_params(&self) -> Result<RoutingParams, ConfigValidationError> {
        Ok(RoutingParams::default()
            .with_routing_model(self.models.parse_routing()?)
            .with_execution_model(self.models.parse_execution()?)
            .with_max_tool_calls(self.execution.max_tool_calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::InterruptMode;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.catalog().len(), 4);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[models]
routing = "openai/gpt-4o-mini"
execution = "openai/gpt-4o"

[llm]
base_url = "http://localhost:8080/v1"
api_key_env = "LOCAL_KEY"

[lifecycle]
shutdown_timeout_ms = 1500
interrupt = "polling"

[logging]
file = "toolrouter.log"

[execution]
max_tool_calls = 2

[prompts]
router_system = "Choose from:\n{tool_descriptions}"

[servers.git]
command = "uvx"
args = ["mcp-server-git"]
description = "Git repository operations"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_empty());

        let params = config.routing_params().unwrap();
        assert_eq!(params.routing_model.name(), "gpt-4o-mini");
        assert_eq!(params.execution_model.name(), "gpt-4o");
        assert_eq!(params.max_tool_calls, 2);

        assert_eq!(config.llm.settings().base_url, "http://localhost:8080/v1");
        assert_eq!(
            config.lifecycle.settings().shutdown_timeout,
            Duration::from_millis(1500)
        );
        assert_eq!(config.lifecycle.interrupt, InterruptMode::Polling);
        assert_eq!(config.logging.file_path(), Some("toolrouter.log"));
        assert!(config.prompts.overrides().router_system.is_some());

        // Deserialized on its own, a [servers] table replaces the defaults
        let catalog = config.catalog();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("git").unwrap().argv(), vec!["uvx", "mcp-server-git"]);
    }

    #[test]
    fn test_disabled_servers_are_skipped() {
        let mut config = FileConfig::default();
        config.servers.get_mut("puppeteer").unwrap().enabled = false;

        let catalog = config.catalog();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.get("puppeteer").is_none());
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut config = FileConfig::default();
        config.models.routing = String::new();
        config.lifecycle.kill_wait_ms = 0;
        config.execution.max_tool_calls = 0;
        config.servers.insert(
            "broken".to_string(),
            FileServerConfig {
                description: "Broken".to_string(),
                command: " ".to_string(),
                ..Default::default()
            },
        );

        let errors = config.validate();
        assert!(errors.contains(&ConfigValidationError::EmptyModelName { field: "routing" }));
        assert!(errors.contains(&ConfigValidationError::ZeroTimeout {
            field: "kill_wait_ms"
        }));
        assert!(errors.contains(&ConfigValidationError::ZeroMaxToolCalls));
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigValidationError::InvalidServer { server, .. } if server == "broken"
        )));
    }

    #[test]
    fn test_no_enabled_servers_is_an_error() {
        let mut config = FileConfig::default();
        for server in config.servers.values_mut() {
            server.enabled = false;
        }
        assert_eq!(config.validate(), vec![ConfigValidationError::NoServers]);
    }

    #[test]
    fn test_reserved_server_name_is_rejected() {
        let mut config = FileConfig::default();
        config.servers.insert(
            "none".to_string(),
            FileServerConfig {
                description: "Nothing".to_string(),
                ..Default::default()
            },
        );
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.to_string().contains("reserved")));
    }
}
