//! Execution limits from TOML (`[execution]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutionConfig {
    /// Tool calls honoured from a single execution turn
    pub max_tool_calls: usize,
}

impl Default for FileExecutionConfig {
    fn default() -> Self {
        Self { max_tool_calls: 4 }
    }
}
