//! Prompt overrides from TOML (`[prompts]` section)

use serde::{Deserialize, Serialize};
use toolrouter_domain::PromptOverrides;

/// Replacement prompt templates
///
/// Templates keep the `{placeholder}` syntax of the built-in prompts, e.g.
/// `{tool_descriptions}` for the router and `{tools}` / `{input}` for the
/// executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePromptsConfig {
    pub router_system: Option<String>,
    pub executor_system: Option<String>,
    pub error_handling: Option<String>,
}

impl FilePromptsConfig {
    pub fn overrides(&self) -> PromptOverrides {
        let keep = |s: &Option<String>| s.clone().filter(|t| !t.trim().is_empty());
        PromptOverrides {
            router_system: keep(&self.router_system),
            executor_system: keep(&self.executor_system),
            error_handling: keep(&self.error_handling),
        }
    }
}
