//! General log file from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};

/// Crates whose debug output would drown the session log.
const QUIET_TARGETS: [&str; 4] = ["hyper", "hyper_util", "reqwest", "h2"];

/// Session log configuration from TOML
///
/// # Example
///
/// ```toml
/// [logging]
/// file = "toolrouter.log"   # appended to across runs
/// level = "debug"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Log file path; empty disables it
    pub file: String,
    pub level: String,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            file: String::new(),
            level: "debug".to_string(),
        }
    }
}

impl FileLoggingConfig {
    pub fn file_path(&self) -> Option<&str> {
        let path = self.file.trim();
        (!path.is_empty()).then_some(path)
    }

    /// `EnvFilter` directives: the configured level, HTTP client crates
    /// capped at `warn`.
    pub fn filter_directives(&self) -> String {
        let level = match self.level.trim() {
            "" => "debug",
            level => level,
        };
        QUIET_TARGETS
            .iter()
            .fold(level.to_lowercase(), |directives, target| {
                format!("{},{}=warn", directives, target)
            })
    }
}
