//! CLI entrypoint for toolrouter
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use toolrouter_application::{
    ConversationLogger, HandleRequestUseCase, InterruptPort, NoConversationLogger, RoutingParams,
};
use toolrouter_domain::{PromptTemplate, ServerCatalog};
use toolrouter_infrastructure::config::{ConfigLoader, FileConfig, FileLoggingConfig};
use toolrouter_infrastructure::lifecycle::{
    self, EventLoopScope, InterruptMode, ScopeHandle, ScopeOutcome,
};
use toolrouter_infrastructure::{
    JsonlConversationLogger, McpToolServers, OpenAiGateway, ServerLauncher,
    ServerLifecycleManager,
};
use toolrouter_presentation::{ChatRepl, Cli, ConsoleFormatter, ReplExit};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Grace period for stray runtime tasks once the scope has torn down.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", ConsoleFormatter::format_error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };
    apply_overrides(&mut config, &cli)?;

    let _log_guards = init_logging(
        cli.verbose,
        config.lifecycle.cleanup_log_path(),
        &config.logging,
    );
    info!("Starting toolrouter");

    let errors = config.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("  {}", error);
        }
        bail!("Invalid configuration ({} problems)", errors.len());
    }

    let catalog = Arc::new(config.catalog());
    if cli.list_servers {
        print!("{}", ConsoleFormatter::format_servers(&catalog));
        return Ok(ExitCode::SUCCESS);
    }

    // === Dependency Injection ===
    let gateway = Arc::new(OpenAiGateway::from_env(&config.llm.settings())?);
    let params = config.routing_params()?;
    let prompts = Arc::new(PromptTemplate::with_overrides(config.prompts.overrides()));
    let conversation_logger: Arc<dyn ConversationLogger> = match &cli.conversation_log {
        Some(path) => Arc::new(JsonlConversationLogger::open(path).with_context(|| {
            format!("Failed to open conversation log {}", path.display())
        })?),
        None => Arc::new(NoConversationLogger),
    };

    let session = Session {
        gateway,
        pool: Arc::new(McpToolServers::new()),
        catalog,
        prompts,
        params,
        conversation_logger,
        request_timeout: config.lifecycle.request_timeout(),
        question: cli.question.clone(),
        quiet: cli.quiet,
    };
    let settings = config.lifecycle.settings();
    let interrupt_mode = config.lifecycle.interrupt;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let code = runtime.block_on(async move {
        let manager = Arc::new(ServerLifecycleManager::new(settings));
        let scope = EventLoopScope::new(manager, interrupt_mode.handler());
        info!("Interrupt mode: {}", interrupt_mode.resolve());

        match scope.run(|handle| session.run(handle)).await {
            Ok(ScopeOutcome::Completed(code)) => Ok(code),
            Ok(ScopeOutcome::Interrupted) => {
                println!("Operation cancelled by user");
                Ok(ExitCode::from(130))
            }
            Err(e) => Err(e),
        }
    });

    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    code
}

/// Everything the scope body needs once the runtime is up.
struct Session {
    gateway: Arc<OpenAiGateway>,
    pool: Arc<McpToolServers>,
    catalog: Arc<ServerCatalog>,
    prompts: Arc<PromptTemplate>,
    params: RoutingParams,
    conversation_logger: Arc<dyn ConversationLogger>,
    request_timeout: Duration,
    question: Option<String>,
    quiet: bool,
}

impl Session {
    async fn run(self, handle: ScopeHandle) -> Result<ExitCode> {
        let launcher =
            ServerLauncher::new(handle.manager().clone(), self.pool.clone(), self.request_timeout);
        launcher.launch_all(&self.catalog).await?;

        let use_case = HandleRequestUseCase::new(
            self.gateway,
            self.pool,
            self.catalog.clone(),
            self.prompts,
            self.params,
        )
        .with_conversation_logger(self.conversation_logger);
        let interrupt: Arc<dyn InterruptPort> = Arc::new(handle);
        let repl = ChatRepl::new(use_case, self.catalog.clone(), interrupt)
            .with_progress(!self.quiet);

        match self.question {
            Some(question) => {
                if !self.quiet {
                    print!("{}", ConsoleFormatter::format_servers(&self.catalog));
                }
                Ok(if repl.ask(&question).await {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                })
            }
            None => Ok(match repl.run().await? {
                ReplExit::Quit => ExitCode::SUCCESS,
                ReplExit::Interrupted => ExitCode::from(130),
            }),
        }
    }
}

fn apply_overrides(config: &mut FileConfig, cli: &Cli) -> Result<()> {
    if let Some(model) = &cli.routing_model {
        config.models.routing = model.clone();
    }
    if let Some(model) = &cli.execution_model {
        config.models.execution = model.clone();
    }
    if let Some(path) = &cli.log_file {
        config.logging.file = path.to_string_lossy().into_owned();
    }
    if let Some(choice) = cli.interrupt {
        config.lifecycle.interrupt = choice
            .as_str()
            .parse::<InterruptMode>()
            .map_err(anyhow::Error::msg)?;
    }
    Ok(())
}

/// Console logging by verbosity, the lifecycle log file and the optional
/// session log file.
///
/// The returned guards flush the file writers when dropped.
fn init_logging(
    verbose: u8,
    cleanup_log: Option<&str>,
    session_log: &FileLoggingConfig,
) -> Vec<WorkerGuard> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let mut guards = Vec::new();
    let mut open_errors = Vec::new();

    // Overwritten on every run
    let cleanup = match cleanup_log.map(|path| (path, File::create(path))) {
        Some((_, Ok(file))) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            guards.push(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(Targets::new().with_target(lifecycle::LOG_TARGET, LevelFilter::DEBUG)),
            )
        }
        Some((path, Err(e))) => {
            open_errors.push(format!("Could not open cleanup log {}: {}", path, e));
            None
        }
        None => None,
    };

    // Appended to across runs
    let session_file = session_log
        .file_path()
        .map(|path| (path, OpenOptions::new().create(true).append(true).open(path)));
    let session = match session_file {
        Some((_, Ok(file))) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            guards.push(guard);
            let filter = EnvFilter::try_new(session_log.filter_directives()).unwrap_or_else(|e| {
                open_errors.push(format!("Invalid logging.level '{}': {}", session_log.level, e));
                EnvFilter::new("debug")
            });
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(filter),
            )
        }
        Some((path, Err(e))) => {
            open_errors.push(format!("Could not open log file {}: {}", path, e));
            None
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(cleanup)
        .with(session)
        .init();

    for message in open_errors {
        warn!("{}", message);
    }

    guards
}
