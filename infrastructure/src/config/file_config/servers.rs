//! Tool server definitions from TOML (`[servers.<name>]` sections)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use toolrouter_domain::ServerSpec;
use tracing::warn;

/// One tool server launch definition
///
/// # Example
///
/// ```toml
/// [servers.brave-search]
/// command = "npm"
/// args = ["exec", "@modelcontextprotocol/server-brave-search", "--"]
/// description = "Web search operations"
/// env = { BRAVE_API_KEY = "${BRAVE_API_KEY}" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Values may reference the ambient environment as `${VAR}`
    pub env: BTreeMap<String, String>,
    /// Shown to the router model when it picks a server
    pub description: String,
    pub enabled: bool,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            command: npm_command().to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            description: String::new(),
            enabled: true,
        }
    }
}

impl FileServerConfig {
    fn npm_exec(package: &str, extra: &[&str], description: &str) -> Self {
        let mut args = vec!["exec".to_string(), package.to_string(), "--".to_string()];
        args.extend(extra.iter().map(|a| a.to_string()));
        Self {
            args,
            description: description.to_string(),
            ..Default::default()
        }
    }

    /// Build the launch spec, expanding `${VAR}` references in `env`.
    pub fn to_spec(&self, name: &str) -> ServerSpec {
        let mut spec =
            ServerSpec::new(name, &self.command, &self.description).with_args(&self.args);
        for (key, value) in &self.env {
            spec = spec.with_env(key, expand_env(value, |var| std::env::var(var).ok()));
        }
        spec
    }
}

fn npm_command() -> &'static str {
    if cfg!(windows) { "npm.cmd" } else { "npm" }
}

/// The four stock MCP servers.
pub fn default_servers() -> BTreeMap<String, FileServerConfig> {
    let mut brave = FileServerConfig::npm_exec(
        "@modelcontextprotocol/server-brave-search",
        &[],
        "Web search operations",
    );
    brave
        .env
        .insert("BRAVE_API_KEY".to_string(), "${BRAVE_API_KEY}".to_string());

    BTreeMap::from([
        (
            "filesystem".to_string(),
            FileServerConfig::npm_exec(
                "@modelcontextprotocol/server-filesystem",
                &["."],
                "File system operations",
            ),
        ),
        (
            "puppeteer".to_string(),
            FileServerConfig::npm_exec(
                "@modelcontextprotocol/server-puppeteer",
                &[],
                "Web browser automation",
            ),
        ),
        ("brave-search".to_string(), brave),
        (
            "mcp-reasoner".to_string(),
            FileServerConfig::npm_exec(
                "@modelcontextprotocol/server-mcp-reasoner",
                &[],
                "Advanced reasoning",
            ),
        ),
    ])
}

/// Replace every `${VAR}` in `value` using `lookup`.
///
/// Unset variables expand to an empty string with a warning. An unterminated
/// `${` is kept literally.
pub fn expand_env(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        match lookup(var) {
            Some(v) => out.push_str(&v),
            None => warn!("Environment variable {} is not set", var),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
