//! Launching configured MCP servers
//!
//! Each server goes through the same steps: resolve the command, spawn and
//! register the process, drain its stderr and supervise it as tracked tasks,
//! then connect over stdio, register the connection for cleanup and run the
//! handshake. Any failure is fatal for startup; whatever was already started
//! is torn down by the lifecycle manager's shutdown.

use super::connection::McpConnection;
use super::error::Result;
use super::pool::McpToolServers;
use crate::lifecycle::{LifecycleError, ServerLifecycleManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::ChildStderr;
use toolrouter_domain::{ServerCatalog, ServerSpec};
use tracing::{debug, info};

pub struct ServerLauncher {
    manager: Arc<ServerLifecycleManager>,
    pool: Arc<McpToolServers>,
    request_timeout: Duration,
}

impl ServerLauncher {
    pub fn new(
        manager: Arc<ServerLifecycleManager>,
        pool: Arc<McpToolServers>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            manager,
            pool,
            request_timeout,
        }
    }

    /// Start every server in `catalog`, in catalog order.
    pub async fn launch_all(&self, catalog: &ServerCatalog) -> Result<usize> {
        for spec in catalog.iter() {
            self.launch(spec).await?;
        }
        info!("{} tool servers ready", catalog.len());
        Ok(catalog.len())
    }

    pub async fn launch(&self, spec: &ServerSpec) -> Result<Arc<McpConnection>> {
        let name = spec.name.as_str();
        let program = which::which(&spec.command).map_err(|_| LifecycleError::CommandNotFound {
            name: name.to_string(),
            command: spec.command.clone(),
        })?;
        debug!("Resolved '{}' to {}", spec.command, program.display());

        let mut argv = spec.argv();
        argv[0] = program.to_string_lossy().into_owned();

        let (process, mut pipes) = self.manager.create_server_process(name, &argv, &spec.env)?;
        let missing = |pipe: &'static str| LifecycleError::MissingPipe {
            name: name.to_string(),
            pipe,
        };
        let stdin = pipes.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = pipes.stdout.take().ok_or_else(|| missing("stdout"))?;
        if let Some(stderr) = pipes.stderr.take() {
            self.manager.add_server(
                &format!("{}-stderr", name),
                drain_stderr(name.to_string(), stderr),
            )?;
        }
        self.manager.supervise(name, process)?;

        let connection = McpConnection::start(name, stdout, stdin, self.request_timeout)?;
        self.manager.transports().register(&connection);
        connection.initialize().await?;

        self.pool.insert(name, connection.clone());
        info!("Tool server '{}' started", name);
        Ok(connection)
    }
}

/// Forward a server's stderr to the log, line by line.
async fn drain_stderr(server: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("[{} stderr] {}", server, line);
    }
}
