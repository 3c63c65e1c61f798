//! Configuration file loading for toolrouter
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOLROUTER_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./toolrouter.toml` or `./.toolrouter.toml`
//! 4. Global: `$XDG_CONFIG_HOME/toolrouter/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileExecutionConfig, FileLifecycleConfig, FileLlmConfig,
    FileLoggingConfig, FileModelsConfig, FilePromptsConfig, FileServerConfig, default_servers,
    expand_env,
};
pub use loader::ConfigLoader;
