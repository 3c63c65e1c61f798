//! REPL (Read-Eval-Print Loop) for interactive requests

use super::reader::{LineReader, ReadEvent};
use crate::ConsoleFormatter;
use crate::{ProgressReporter, SimpleProgress};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use toolrouter_application::{
    HandleRequestUseCase, InterruptPort, NoProgress, RequestProgress,
};
use toolrouter_domain::ServerCatalog;
use tracing::info;

const PROMPT: &str = "toolrouter> ";

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    /// Exit word or end of input
    Quit,
    /// Ctrl-C at the prompt; the interrupt path has run
    Interrupted,
}

/// What a prompt line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineCommand<'a> {
    Skip,
    Exit,
    Help,
    Servers,
    Unknown(&'a str),
    Request(&'a str),
}

fn parse_line(line: &str) -> LineCommand<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineCommand::Skip;
    }
    match line.to_ascii_lowercase().as_str() {
        "exit" | "quit" | "q" | "/exit" | "/quit" | "/q" => LineCommand::Exit,
        "/help" | "/h" | "/?" => LineCommand::Help,
        "/servers" => LineCommand::Servers,
        _ if line.starts_with('/') => LineCommand::Unknown(line),
        _ => LineCommand::Request(line),
    }
}

/// Interactive request loop
pub struct ChatRepl {
    use_case: HandleRequestUseCase,
    catalog: Arc<ServerCatalog>,
    interrupt: Arc<dyn InterruptPort>,
    show_progress: bool,
    history_path: Option<PathBuf>,
}

impl ChatRepl {
    pub fn new(
        use_case: HandleRequestUseCase,
        catalog: Arc<ServerCatalog>,
        interrupt: Arc<dyn InterruptPort>,
    ) -> Self {
        Self {
            use_case,
            catalog,
            interrupt,
            show_progress: true,
            history_path: Self::default_history_path(),
        }
    }

    /// Set whether to show progress
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_history_path(mut self, path: Option<PathBuf>) -> Self {
        self.history_path = path;
        self
    }

    pub fn default_history_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("toolrouter").join("history.txt"))
    }

    /// Run the interactive loop until an exit word, end of input or Ctrl-C.
    pub async fn run(&self) -> std::io::Result<ReplExit> {
        let mut reader = LineReader::spawn(self.history_path.clone())?;

        self.print_welcome();

        let exit = loop {
            match reader.read_line(PROMPT).await {
                ReadEvent::Line(line) => match parse_line(&line) {
                    LineCommand::Skip => continue,
                    LineCommand::Exit => {
                        println!("Bye!");
                        break ReplExit::Quit;
                    }
                    LineCommand::Help => Self::print_help(),
                    LineCommand::Servers => {
                        print!("{}", ConsoleFormatter::format_servers(&self.catalog));
                    }
                    LineCommand::Unknown(cmd) => {
                        println!("Unknown command: {}", cmd);
                        println!("Type /help for available commands");
                    }
                    LineCommand::Request(request) => {
                        self.ask(request).await;
                        if self.interrupt.is_interrupted() {
                            break ReplExit::Interrupted;
                        }
                    }
                },
                ReadEvent::Interrupted => {
                    println!("{}", "Operation cancelled by user".yellow());
                    self.interrupt.interrupt().await;
                    break ReplExit::Interrupted;
                }
                ReadEvent::Eof => {
                    println!("Bye!");
                    break ReplExit::Quit;
                }
                ReadEvent::Failed(e) => {
                    eprintln!("{}", ConsoleFormatter::format_error(&e));
                    break ReplExit::Quit;
                }
            }
        };

        reader.close();
        Ok(exit)
    }

    /// Handle one request and print the result; returns whether it succeeded.
    pub async fn ask(&self, request: &str) -> bool {
        println!();
        let started = Instant::now();

        let reporter: Box<dyn RequestProgress> = if !self.show_progress {
            Box::new(NoProgress)
        } else if std::io::stderr().is_terminal() {
            Box::new(ProgressReporter::new())
        } else {
            Box::new(SimpleProgress)
        };

        let result = self.use_case.execute(request, reporter.as_ref()).await;
        let elapsed = started.elapsed();
        info!("Request handled in {:?}", elapsed);

        let ok = match result {
            Ok(output) => {
                print!("{}", ConsoleFormatter::format_output(&output));
                !output.state.has_errors()
            }
            Err(e) => {
                eprintln!("{}", ConsoleFormatter::format_error(&e));
                false
            }
        };
        println!("{}", ConsoleFormatter::format_elapsed(elapsed));
        println!();
        ok
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│        toolrouter - Interactive Mode        │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        let params = self.use_case.params();
        println!("Routing model:   {}", params.routing_model);
        println!("Execution model: {}", params.execution_model);
        println!();
        print!("{}", ConsoleFormatter::format_servers(&self.catalog));
        println!();
        println!("Type a request, /help for commands, or exit to quit.");
        println!();
    }

    fn print_help() {
        println!();
        println!("Commands:");
        println!("  /help, /h, /?          - Show this help");
        println!("  /servers               - List tool servers");
        println!("  exit, quit, q, /exit   - Leave the prompt");
        println!("  Ctrl-C                 - Stop all servers and exit");
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use toolrouter_application::{
        ChatRequest, ChatResponse, GatewayError, LlmGateway, NoInterrupt, RoutingParams,
        ToolServerError, ToolServerPort,
    };
    use toolrouter_domain::{PromptTemplate, ServerSpec, ToolDescriptor, ToolInvocation, ToolOutput};

    struct NoneRouter;

    #[async_trait]
    impl LlmGateway for NoneRouter {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, GatewayError> {
            Ok(ChatResponse::text("none"))
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl LlmGateway for FailingGateway {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, GatewayError> {
            Err(GatewayError::Timeout)
        }
    }

    struct NoServers;

    #[async_trait]
    impl ToolServerPort for NoServers {
        fn servers(&self) -> Vec<String> {
            Vec::new()
        }

        async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, ToolServerError> {
            Err(ToolServerError::UnknownServer(server.to_string()))
        }

        async fn call_tool(
            &self,
            server: &str,
            _call: &ToolInvocation,
        ) -> Result<ToolOutput, ToolServerError> {
            Err(ToolServerError::UnknownServer(server.to_string()))
        }
    }

    fn repl(gateway: Arc<dyn LlmGateway>) -> ChatRepl {
        let catalog =
            Arc::new(ServerCatalog::new().register(ServerSpec::new("filesystem", "npm", "Files")));
        let use_case = HandleRequestUseCase::new(
            gateway,
            Arc::new(NoServers),
            catalog.clone(),
            Arc::new(PromptTemplate::new()),
            RoutingParams::default(),
        );
        ChatRepl::new(use_case, catalog, Arc::new(NoInterrupt))
            .with_progress(false)
            .with_history_path(None)
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   "), LineCommand::Skip);
        for word in ["exit", "QUIT", "q", "/exit", "/quit", "/q"] {
            assert_eq!(parse_line(word), LineCommand::Exit, "{word}");
        }
        assert_eq!(parse_line("/help"), LineCommand::Help);
        assert_eq!(parse_line("/servers"), LineCommand::Servers);
        assert_eq!(parse_line("/nope"), LineCommand::Unknown("/nope"));
        assert_eq!(
            parse_line("  list files in src  "),
            LineCommand::Request("list files in src")
        );
        // Only whole-line exit words end the loop
        assert_eq!(parse_line("quit smoking"), LineCommand::Request("quit smoking"));
    }

    #[tokio::test]
    async fn test_ask_with_no_tool_succeeds() {
        assert!(repl(Arc::new(NoneRouter)).ask("hello there").await);
    }

    #[tokio::test]
    async fn test_ask_reports_gateway_errors_inline() {
        assert!(!repl(Arc::new(FailingGateway)).ask("list files").await);
    }
}
