//! A single downstream MCP server connection and its state machine.
//!
//! ```text
//! DISCONNECTED ──start──▶ CONNECTING ──ok──▶ CONNECTED
//!      ▲                      │                │
//!      │                      └──err──▶ ERROR ─┘
//!      └─────── shutdown / permanent failure ──┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mcphub_domain::config::ServerConfig;
use mcphub_domain::tool::{Tool, ToolOrigin, ToolResult, ToolResultContent, ToolsListResult};
use mcphub_domain::HubError;
use mcphub_transport::{
    initialize_params, McpTransport, MessageDirection, MessageTap, SseTransport, StdioTransport,
    StreamableHttpTransport,
};
use serde_json::Value;

/// Observes every JSON-RPC message actually sent or received on a
/// connection, keyed by that connection's server id. Installed by the
/// server manager for message-trace observability.
pub type MessageTracker = Arc<dyn Fn(&str, MessageDirection, &str, &Value) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error { message: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error { .. } => "error",
        }
    }
}

/// A connection to one downstream MCP server. Owned exclusively by the
/// server manager; other components hold only the server id.
pub struct ServerConnection {
    pub id: String,
    pub config: ServerConfig,
    pub state: ConnectionState,
    pub tools: Vec<Tool>,
    pub reconnect_attempts: u32,
    pub last_status_change: DateTime<Utc>,
    transport: Option<Arc<dyn McpTransport>>,
    tracker: Option<MessageTracker>,
}

impl ServerConnection {
    pub fn new(id: String, config: ServerConfig) -> Self {
        Self {
            id,
            config,
            state: ConnectionState::Disconnected,
            tools: Vec::new(),
            reconnect_attempts: 0,
            last_status_change: Utc::now(),
            transport: None,
            tracker: None,
        }
    }

    /// Install a tap that observes every message this connection's
    /// transport actually sends or receives from here on. Applied
    /// immediately to an already-connected transport, and again to every
    /// transport built by a future reconnect.
    pub fn set_message_tracker(&mut self, tracker: MessageTracker) {
        if let Some(transport) = &self.transport {
            transport.set_message_tap(Self::wrap_tracker(self.id.clone(), tracker.clone()));
        }
        self.tracker = Some(tracker);
    }

    fn wrap_tracker(server_id: String, tracker: MessageTracker) -> MessageTap {
        Arc::new(move |direction, method, payload| tracker(&server_id, direction, method, payload))
    }

    fn set_state(&mut self, state: ConnectionState) {
        tracing::info!(server_id = %self.id, state = state.label(), "connection state changed");
        self.state = state;
        self.last_status_change = Utc::now();
    }

    fn build_transport(&self) -> Result<Arc<dyn McpTransport>, HubError> {
        let transport: Arc<dyn McpTransport> = match &self.config {
            ServerConfig::Stdio { command, args, env, .. } => {
                let t = StdioTransport::spawn(command, args, env)
                    .map_err(|e| HubError::Transport(e.to_string()))?;
                Arc::new(t)
            }
            ServerConfig::HttpSse { url, headers, .. } => Arc::new(SseTransport::new(url.clone(), headers.clone())),
            ServerConfig::HttpStream { url, headers, .. } => {
                Arc::new(StreamableHttpTransport::new(url.clone(), headers.clone()))
            }
        };
        Ok(transport)
    }

    /// Attempt `CONNECTING → CONNECTED`: build the transport, run the MCP
    /// handshake (`initialize` + `notifications/initialized`), and cache
    /// `tools/list`. On any failure the connection moves to `Error` and the
    /// manager is responsible for scheduling a reconnect.
    pub async fn connect(&mut self) {
        self.set_state(ConnectionState::Connecting);

        match self.do_connect().await {
            Ok(tools) => {
                self.tools = tools;
                self.reconnect_attempts = 0;
                self.set_state(ConnectionState::Connected);
            }
            Err(e) => {
                tracing::warn!(server_id = %self.id, error = %e, "failed to connect to mcp server");
                self.transport = None;
                self.set_state(ConnectionState::Error { message: e.to_string() });
            }
        }
    }

    async fn do_connect(&mut self) -> Result<Vec<Tool>, HubError> {
        let transport = self.build_transport()?;
        if let Some(tracker) = &self.tracker {
            transport.set_message_tap(Self::wrap_tracker(self.id.clone(), tracker.clone()));
        }
        transport.start().await.map_err(|e| HubError::Transport(e.to_string()))?;

        let init_params = serde_json::to_value(initialize_params())
            .map_err(|e| HubError::Transport(format!("failed to serialize initialize params: {e}")))?;
        let resp = transport
            .send_request("initialize", Some(init_params))
            .await
            .map_err(|e| HubError::Transport(e.to_string()))?;
        if resp.is_error() {
            return Err(HubError::Transport(format!(
                "initialize failed: {}",
                resp.error.map(|e| e.to_string()).unwrap_or_default()
            )));
        }

        transport
            .send_notification("notifications/initialized", None)
            .await
            .map_err(|e| HubError::Transport(e.to_string()))?;

        let tools_resp = transport
            .send_request("tools/list", None)
            .await
            .map_err(|e| HubError::Transport(e.to_string()))?;
        let tools = if tools_resp.is_error() {
            tracing::warn!(server_id = %self.id, "tools/list returned an error, server will expose no tools");
            Vec::new()
        } else {
            let value = tools_resp.result.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolsListResult>(value) {
                Ok(r) => r
                    .tools
                    .into_iter()
                    .map(|t| t.with_origin(ToolOrigin::Mcp { server_id: self.id.clone() }))
                    .collect(),
                Err(e) => {
                    tracing::warn!(server_id = %self.id, error = %e, "failed to parse tools/list result");
                    Vec::new()
                }
            }
        };

        self.transport = Some(transport);
        Ok(tools)
    }

    pub fn is_alive(&self) -> bool {
        self.state.is_connected() && self.transport.as_ref().is_some_and(|t| t.is_alive())
    }

    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolResult, HubError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| HubError::ServerNotInitialized(self.id.clone()))?;
        if !transport.is_alive() {
            return Err(HubError::ServerNotInitialized(self.id.clone()));
        }

        let params = serde_json::json!({ "name": tool_name, "arguments": arguments });
        let resp = transport
            .send_request("tools/call", Some(params))
            .await
            .map_err(|e| HubError::ToolExecutionFailed(e.to_string()))?;

        if resp.is_error() {
            let err = resp.error.map(|e| e.to_string()).unwrap_or_default();
            return Ok(ToolResult {
                content: vec![ToolResultContent::Text { text: err }],
                is_error: true,
            });
        }

        let value = resp.result.unwrap_or(Value::Null);
        serde_json::from_value::<ToolResult>(value)
            .map_err(|e| HubError::ToolExecutionFailed(format!("failed to parse tools/call result: {e}")))
    }

    /// Close the transport, bounded by the caller's deadline.
    pub async fn disconnect(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.close().await;
        }
        self.set_state(ConnectionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn stdio_config() -> ServerConfig {
        ServerConfig::Stdio {
            command: "__definitely_not_a_real_binary__".into(),
            args: vec![],
            env: HashMap::new(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn connect_failure_moves_to_error_state() {
        let mut conn = ServerConnection::new("a".into(), stdio_config());
        conn.connect().await;
        assert!(matches!(conn.state, ConnectionState::Error { .. }));
        assert!(!conn.is_alive());
    }

    #[test]
    fn fresh_connection_starts_disconnected() {
        let conn = ServerConnection::new("a".into(), stdio_config());
        assert_eq!(conn.state, ConnectionState::Disconnected);
        assert!(conn.tools.is_empty());
    }
}
