//! MCP client connection over a byte stream
//!
//! A connection owns two background tasks:
//!
//! - the **writer** owns the server's stdin and writes queued frames, one per
//!   line. When it stops it shuts its half down, so the server sees EOF.
//! - the **reader** owns the server's stdout. It hands responses to the
//!   pending request with the same id, answers `ping`, rejects every other
//!   server request with `-32601` and logs notifications.
//!
//! Closing cancels both tasks. EOF or a read error on stdout closes the
//! connection too, failing all pending requests.

use super::error::{McpError, Result};
use super::protocol::{
    CallToolResult, InitializeResult, JsonRpcNotification, JsonRpcReply, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, METHOD_NOT_FOUND, MessageKind, PROTOCOL_VERSION,
    call_tool_params, classify_message, initialize_params,
};
use crate::lifecycle::{LifecycleError, ManagedTransport};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use toolrouter_domain::{ToolDescriptor, ToolInvocation, ToolOutput};
use tracing::{debug, info, trace, warn};

/// Default bound for a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const CLIENT_NAME: &str = "toolrouter";

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

pub struct McpConnection {
    server: String,
    next_id: AtomicU64,
    outgoing: mpsc::UnboundedSender<String>,
    pending: PendingMap,
    cancel: CancellationToken,
    tasks: TaskTracker,
    request_timeout: Duration,
}

impl std::fmt::Debug for McpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpConnection")
            .field("server", &self.server)
            .field("closed", &self.cancel.is_cancelled())
            .finish()
    }
}

impl McpConnection {
    /// Start the reader and writer tasks for `server`.
    ///
    /// No handshake is performed; call [`initialize`](Self::initialize).
    pub fn start<R, W>(
        server: &str,
        reader: R,
        writer: W,
        request_timeout: Duration,
    ) -> Result<Arc<Self>>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|_| LifecycleError::NoRuntime(format!("{} connection", server)))?;

        let (outgoing, rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::default();
        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();

        tasks.spawn_on(
            write_loop(server.to_string(), writer, rx, cancel.clone()),
            &runtime,
        );
        tasks.spawn_on(
            read_loop(
                ReaderContext {
                    server: server.to_string(),
                    pending: pending.clone(),
                    outgoing: outgoing.clone(),
                    cancel: cancel.clone(),
                },
                reader,
            ),
            &runtime,
        );
        tasks.close();

        Ok(Arc::new(Self {
            server: server.to_string(),
            next_id: AtomicU64::new(1),
            outgoing,
            pending,
            cancel,
            tasks,
            request_timeout,
        }))
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn closed(&self) -> McpError {
        McpError::Closed(self.server.clone())
    }

    fn forget(&self, id: u64) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    /// Send a request and wait for its response.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        if self.is_closed() {
            return Err(self.closed());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        if self.is_closed() {
            self.forget(id);
            return Err(self.closed());
        }

        trace!("[{}] -> {}", self.server, line);
        if self.outgoing.send(line).is_err() {
            self.forget(id);
            return Err(self.closed());
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => match response.error {
                Some(error) => Err(McpError::Rpc {
                    code: error.code,
                    message: error.message,
                }),
                None => Ok(response.result.unwrap_or(Value::Null)),
            },
            Ok(Err(_)) => Err(self.closed()),
            Err(_) => {
                self.forget(id);
                warn!(
                    "[{}] {} timed out after {:?}",
                    self.server, method, self.request_timeout
                );
                Err(McpError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }

    /// Send a notification (no response expected).
    pub fn notify(&self, method: &str) -> Result<()> {
        let line = serde_json::to_string(&JsonRpcNotification::new(method))?;
        self.outgoing.send(line).map_err(|_| self.closed())
    }

    /// Perform the `initialize` handshake.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let params = initialize_params(CLIENT_NAME, env!("CARGO_PKG_VERSION"));
        let raw = self.request("initialize", Some(params)).await?;
        let result: InitializeResult =
            serde_json::from_value(raw).map_err(|e| McpError::UnexpectedResponse {
                method: "initialize".to_string(),
                detail: e.to_string(),
            })?;

        if result.protocol_version != PROTOCOL_VERSION {
            warn!(
                "[{}] Server speaks protocol {}, requested {}",
                self.server, result.protocol_version, PROTOCOL_VERSION
            );
        }
        match &result.server_info {
            Some(info) => info!(
                "[{}] Connected to {} {}",
                self.server,
                info.name,
                info.version.as_deref().unwrap_or("")
            ),
            None => info!("[{}] Connected", self.server),
        }

        self.notify("notifications/initialized")?;
        Ok(result)
    }

    /// `tools/list`, following `nextCursor` until the last page.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let raw = self.request("tools/list", params).await?;
            let page: ListToolsResult =
                serde_json::from_value(raw).map_err(|e| McpError::UnexpectedResponse {
                    method: "tools/list".to_string(),
                    detail: e.to_string(),
                })?;
            tools.extend(page.tools.into_iter().map(ToolDescriptor::from));

            match page.next_cursor {
                Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
                _ => break,
            }
        }

        debug!("[{}] {} tools available", self.server, tools.len());
        Ok(tools)
    }

    /// `tools/call` for `invocation`.
    pub async fn call_tool(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let params = call_tool_params(&invocation.name, &invocation.arguments);
        let raw = self.request("tools/call", Some(params)).await?;
        let result: CallToolResult =
            serde_json::from_value(raw).map_err(|e| McpError::UnexpectedResponse {
                method: "tools/call".to_string(),
                detail: e.to_string(),
            })?;
        Ok(result.into_output(&invocation.name))
    }
}

#[async_trait]
impl ManagedTransport for McpConnection {
    fn label(&self) -> String {
        self.server.clone()
    }

    fn is_closing(&self) -> bool {
        self.is_closed()
    }

    fn close(&self) -> std::io::Result<()> {
        debug!("[{}] Closing connection", self.server);
        self.cancel.cancel();
        Ok(())
    }

    async fn wait_closed(&self) {
        self.tasks.wait().await;
    }
}

impl Drop for McpConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn write_loop<W>(
    server: String,
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    let mut draining = false;
    loop {
        let line = if draining {
            match rx.try_recv() {
                Ok(line) => line,
                Err(_) => break,
            }
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // Frames queued before the close still go out
                    draining = true;
                    continue;
                }
                line = rx.recv() => match line {
                    Some(line) => line,
                    None => break,
                },
            }
        };

        if let Err(e) = write_frame(&mut writer, &line).await {
            warn!("[{}] Write failed: {}", server, e);
            cancel.cancel();
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("[{}] stdin shutdown: {}", server, e);
    }
    debug!("[{}] Writer stopped", server);
}

async fn write_frame<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

struct ReaderContext {
    server: String,
    pending: PendingMap,
    outgoing: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl ReaderContext {
    fn reply(&self, reply: JsonRpcReply) {
        match serde_json::to_string(&reply) {
            Ok(line) => {
                if self.outgoing.send(line).is_err() {
                    debug!("[{}] Reply dropped, writer gone", self.server);
                }
            }
            Err(e) => warn!("[{}] Failed to encode reply: {}", self.server, e),
        }
    }

    fn dispatch(&self, frame: Value) {
        match classify_message(&frame) {
            MessageKind::Response => {
                let response: JsonRpcResponse = match serde_json::from_value(frame) {
                    Ok(response) => response,
                    Err(e) => {
                        warn!("[{}] Malformed response: {}", self.server, e);
                        return;
                    }
                };
                let Some(id) = response.id.as_u64() else {
                    debug!("[{}] Response with foreign id {}", self.server, response.id);
                    return;
                };
                let sender = self
                    .pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&id);
                match sender {
                    Some(sender) => {
                        let _ = sender.send(response);
                    }
                    None => debug!("[{}] Response for unknown request {}", self.server, id),
                }
            }
            MessageKind::IncomingRequest { id } => {
                let method = frame
                    .get("method")
                    .and_then(|m| m.as_str())
                    .unwrap_or_default();
                if method == "ping" {
                    trace!("[{}] ping", self.server);
                    self.reply(JsonRpcReply::result(id, json!({})));
                } else {
                    debug!("[{}] Rejecting server request {}", self.server, method);
                    self.reply(JsonRpcReply::error(
                        id,
                        METHOD_NOT_FOUND,
                        format!("Method not found: {}", method),
                    ));
                }
            }
            MessageKind::Notification => {
                let method = frame
                    .get("method")
                    .and_then(|m| m.as_str())
                    .unwrap_or("(none)");
                debug!("[{}] Notification {}", self.server, method);
            }
        }
    }
}

async fn read_loop<R>(context: ReaderContext, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            biased;
            _ = context.cancel.cancelled() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                trace!("[{}] <- {}", context.server, line);
                match serde_json::from_str::<Value>(line) {
                    Ok(frame) => context.dispatch(frame),
                    Err(_) => debug!("[{}] Ignoring non-JSON output: {}", context.server, line),
                }
            }
            Ok(None) => {
                info!("[{}] Server closed its output", context.server);
                break;
            }
            Err(e) => {
                warn!("[{}] Read failed: {}", context.server, e);
                break;
            }
        }
    }

    context.cancel.cancel();
    context
        .pending
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clear();
    debug!("[{}] Reader stopped", context.server);
}
