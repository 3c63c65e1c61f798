//! Named MCP connections behind the tool server port

use super::connection::McpConnection;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use toolrouter_application::{ToolServerError, ToolServerPort};
use toolrouter_domain::{ToolDescriptor, ToolInvocation, ToolOutput};
use tracing::{debug, warn};

/// Live connections keyed by server name.
///
/// Tool lists are fetched once per connection and cached.
#[derive(Default)]
pub struct McpToolServers {
    connections: RwLock<BTreeMap<String, Arc<McpConnection>>>,
    tools: Mutex<HashMap<String, Vec<ToolDescriptor>>>,
}

impl McpToolServers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, server: &str, connection: Arc<McpConnection>) {
        let previous = self
            .connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(server.to_string(), connection);
        if previous.is_some() {
            warn!("Replacing connection for '{}'", server);
        }
        self.tools
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(server);
    }

    pub fn remove(&self, server: &str) -> Option<Arc<McpConnection>> {
        self.tools
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(server);
        self.connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(server)
    }

    pub fn len(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The open connection for `server`.
    pub fn connection(&self, server: &str) -> Result<Arc<McpConnection>, ToolServerError> {
        let connection = self
            .connections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(server)
            .cloned()
            .ok_or_else(|| ToolServerError::UnknownServer(server.to_string()))?;
        if connection.is_closed() {
            return Err(ToolServerError::NotRunning(server.to_string()));
        }
        Ok(connection)
    }
}

#[async_trait]
impl ToolServerPort for McpToolServers {
    fn servers(&self) -> Vec<String> {
        self.connections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(_, c)| !c.is_closed())
            .map(|(name, _)| name.clone())
            .collect()
    }

    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, ToolServerError> {
        let connection = self.connection(server)?;
        if let Some(tools) = self
            .tools
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(server)
        {
            return Ok(tools.clone());
        }

        let tools = connection
            .list_tools()
            .await
            .map_err(|e| e.into_tool_server_error(server))?;
        debug!("Cached {} tools for '{}'", tools.len(), server);
        self.tools
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(server.to_string(), tools.clone());
        Ok(tools)
    }

    async fn call_tool(
        &self,
        server: &str,
        invocation: &ToolInvocation,
    ) -> Result<ToolOutput, ToolServerError> {
        let connection = self.connection(server)?;
        connection
            .call_tool(invocation)
            .await
            .map_err(|e| e.into_tool_server_error(server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ManagedTransport;
    use crate::mcp::connection::DEFAULT_REQUEST_TIMEOUT;
    use crate::mcp::connection::tests::connect;

    #[tokio::test]
    async fn test_unknown_server() {
        let pool = McpToolServers::new();
        let err = pool.list_tools("nowhere").await.unwrap_err();
        assert!(matches!(err, ToolServerError::UnknownServer(name) if name == "nowhere"));
    }

    #[tokio::test]
    async fn test_list_and_call_through_port() {
        let pool = McpToolServers::new();
        let (connection, _server) = connect("fake", vec![], DEFAULT_REQUEST_TIMEOUT);
        pool.insert("fake", connection);

        assert_eq!(pool.servers(), vec!["fake"]);
        let tools = pool.list_tools("fake").await.unwrap();
        assert_eq!(tools.len(), 2);

        let call = ToolInvocation::new("call_1", "echo").with_arg("text", "hi");
        let output = pool.call_tool("fake", &call).await.unwrap();
        assert_eq!(output.as_text(), "hi");
    }

    #[tokio::test]
    async fn test_closed_connection_is_not_running() {
        let pool = McpToolServers::new();
        let (connection, _server) = connect("fake", vec![], DEFAULT_REQUEST_TIMEOUT);
        pool.insert("fake", connection.clone());

        connection.close().unwrap();

        assert!(pool.servers().is_empty());
        let call = ToolInvocation::new("call_1", "echo");
        let err = pool.call_tool("fake", &call).await.unwrap_err();
        assert!(matches!(err, ToolServerError::NotRunning(_)));
    }
}
