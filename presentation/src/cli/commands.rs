//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How Ctrl-C is detected while a request is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InterruptChoice {
    /// Pick per platform
    Auto,
    /// Listen for the OS interrupt signal
    Signal,
    /// Only the prompt's own Ctrl-C handling
    Polling,
}

impl InterruptChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterruptChoice::Auto => "auto",
            InterruptChoice::Signal => "signal",
            InterruptChoice::Polling => "polling",
        }
    }
}

/// CLI arguments for toolrouter
#[derive(Parser, Debug)]
#[command(name = "toolrouter")]
#[command(author, version, about = "Route natural-language requests to MCP tool servers")]
#[command(long_about = r#"
toolrouter launches a set of MCP tool servers, asks a router model which
server fits each request, and lets an execution model call that server's tools.

Configuration files are loaded from (in priority order):
1. TOOLROUTER_* environment variables
2. --config <path>        Explicit config file
3. ./toolrouter.toml      Project-level config
4. ~/.config/toolrouter/config.toml   Global config

Example:
  toolrouter "List the files in the current directory"
  toolrouter --execution-model openai/gpt-4o
  toolrouter --list-servers
"#)]
pub struct Cli {
    /// Request to handle once; starts the interactive prompt when omitted
    pub question: Option<String>,

    /// Model that picks the tool server (provider/name)
    #[arg(long, value_name = "MODEL")]
    pub routing_model: Option<String>,

    /// Model that calls the chosen server's tools (provider/name)
    #[arg(long, value_name = "MODEL")]
    pub execution_model: Option<String>,

    /// Interrupt handling mode
    #[arg(long, value_enum, value_name = "MODE")]
    pub interrupt: Option<InterruptChoice>,

    /// Append a JSONL record of every request to this file
    #[arg(long, value_name = "PATH")]
    pub conversation_log: Option<PathBuf>,

    /// Append a debug log of the whole session to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// List the configured tool servers and exit
    #[arg(long)]
    pub list_servers: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_one_shot_with_overrides() {
        let cli = Cli::try_parse_from([
            "toolrouter",
            "-vv",
            "--routing-model",
            "openai/gpt-4o-mini",
            "--interrupt",
            "polling",
            "read README.md",
        ])
        .unwrap();

        assert_eq!(cli.question.as_deref(), Some("read README.md"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.routing_model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(cli.interrupt, Some(InterruptChoice::Polling));
        assert!(!cli.quiet);
    }

    #[test]
    fn test_defaults_start_interactive() {
        let cli = Cli::try_parse_from(["toolrouter"]).unwrap();
        assert!(cli.question.is_none());
        assert!(cli.interrupt.is_none());
        assert!(!cli.list_servers);
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn test_parse_log_files() {
        let cli = Cli::try_parse_from([
            "toolrouter",
            "--log-file",
            "session.log",
            "--conversation-log",
            "requests.jsonl",
        ])
        .unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("session.log")));
        assert_eq!(cli.conversation_log, Some(PathBuf::from("requests.jsonl")));
    }

    #[test]
    fn test_unknown_interrupt_mode_is_rejected() {
        assert!(Cli::try_parse_from(["toolrouter", "--interrupt", "never"]).is_err());
    }
}
