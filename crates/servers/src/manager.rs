//! Server manager (C3): owns every [`ServerConnection`], drives the
//! initial connect pass, and supervises reconnects.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mcphub_domain::config::McpServersFile;
use mcphub_domain::tool::{Tool, ToolResult};
use mcphub_domain::HubError;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::connection::{ConnectionState, MessageTracker, ServerConnection};
use crate::reconnect::BackoffPolicy;

/// Read-only snapshot of one connection, safe to hand to callers without
/// holding the manager's lock.
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    pub id: String,
    pub state_label: &'static str,
    pub tool_count: usize,
}

/// Hub-wide deadline for [`ServerManager::shutdown`].
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);
/// Per-connection deadline during shutdown; exceeding it abandons the
/// connection rather than blocking its siblings.
const SHUTDOWN_PER_CONNECTION: Duration = Duration::from_secs(2);

pub struct ServerManager {
    connections: RwLock<HashMap<String, Arc<Mutex<ServerConnection>>>>,
    backoff: BackoffPolicy,
    tracker: RwLock<Option<MessageTracker>>,
}

impl ServerManager {
    pub fn empty() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            backoff: BackoffPolicy::default(),
            tracker: RwLock::new(None),
        }
    }

    /// `setMessageTracker(fn)`: installs a tap that observes every JSON-RPC
    /// message actually sent or received by any downstream connection,
    /// keyed by server id. Applies immediately to already-connected
    /// servers and is carried by each connection into its future
    /// reconnects.
    pub async fn set_message_tracker(&self, tracker: MessageTracker) {
        *self.tracker.write() = Some(tracker.clone());
        let conns: Vec<Arc<Mutex<ServerConnection>>> = self.connections.read().values().cloned().collect();
        for conn in conns {
            conn.lock().await.set_message_tracker(tracker.clone());
        }
    }

    /// `initialize()`: build a connection per enabled server and attempt
    /// `CONNECTING → CONNECTED` concurrently. Failures are recorded on the
    /// connection (state → Error) and never abort init for siblings.
    pub async fn initialize(servers: &McpServersFile) -> Arc<Self> {
        let manager = Arc::new(Self::empty());

        let enabled: Vec<(String, _)> = servers
            .mcp_servers
            .iter()
            .filter(|(_, cfg)| cfg.enabled())
            .map(|(id, cfg)| (id.clone(), cfg.clone()))
            .collect();

        let mut handles = Vec::with_capacity(enabled.len());
        for (id, config) in enabled {
            let conn = Arc::new(Mutex::new(ServerConnection::new(id.clone(), config)));
            manager.connections.write().insert(id.clone(), conn.clone());
            handles.push(tokio::spawn(async move {
                conn.lock().await.connect().await;
            }));
        }
        for h in handles {
            let _ = h.await;
        }

        let connected = manager.connected_count().await;
        tracing::info!(connected, total = manager.connections.read().len(), "server manager ready");

        manager
    }

    /// `getAllServers()`: read-only snapshot mapping id → summarised state.
    pub async fn get_all_servers(&self) -> Vec<ServerSnapshot> {
        let conns: Vec<Arc<Mutex<ServerConnection>>> = self.connections.read().values().cloned().collect();
        let mut snapshots = Vec::with_capacity(conns.len());
        for conn in conns {
            let c = conn.lock().await;
            snapshots.push(ServerSnapshot {
                id: c.id.clone(),
                state_label: c.state.label(),
                tool_count: c.tools.len(),
            });
        }
        snapshots
    }

    /// `getServerTools(id)`: cached tools if the connection is alive.
    pub async fn get_server_tools(&self, id: &str) -> Result<Vec<Tool>, HubError> {
        let conn = self
            .connections
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::ServerNotFound(id.to_string()))?;
        let c = conn.lock().await;
        if !c.is_alive() {
            return Err(HubError::ServerNotInitialized(id.to_string()));
        }
        Ok(c.tools.clone())
    }

    pub async fn call_tool(&self, server_id: &str, tool_name: &str, arguments: Value) -> Result<ToolResult, HubError> {
        let conn = self
            .connections
            .read()
            .get(server_id)
            .cloned()
            .ok_or_else(|| HubError::ServerNotFound(server_id.to_string()))?;
        let c = conn.lock().await;
        c.call_tool(tool_name, arguments).await
    }

    /// Schedule exponential backoff reconnects for every connection
    /// currently in `Error` state. Intended to be driven by the health
    /// loop (C7), not called per-request.
    pub fn reconnect_errored(self: &Arc<Self>) {
        let conns: Vec<Arc<Mutex<ServerConnection>>> = self.connections.read().values().cloned().collect();
        for conn in conns {
            let backoff = self.backoff;
            tokio::spawn(async move {
                let (is_error, attempts) = {
                    let c = conn.lock().await;
                    (matches!(c.state, ConnectionState::Error { .. }), c.reconnect_attempts)
                };
                if !is_error || backoff.exhausted(attempts) {
                    return;
                }
                tokio::time::sleep(backoff.delay_for(attempts)).await;
                let mut c = conn.lock().await;
                c.reconnect_attempts += 1;
                c.connect().await;
            });
        }
    }

    pub fn server_count(&self) -> usize {
        self.connections.read().len()
    }

    pub async fn connected_count(&self) -> usize {
        self.get_all_servers().await.iter().filter(|s| s.state_label == "connected").count()
    }

    /// `shutdown()`: close all connections, bounded by a hub-wide deadline;
    /// any connection exceeding the per-connection deadline is abandoned.
    pub async fn shutdown(&self) {
        let conns: Vec<Arc<Mutex<ServerConnection>>> = self.connections.read().values().cloned().collect();
        let closes = conns.into_iter().map(|conn| async move {
            let result = tokio::time::timeout(SHUTDOWN_PER_CONNECTION, async {
                conn.lock().await.disconnect().await;
            })
            .await;
            if result.is_err() {
                tracing::warn!("connection did not close within its deadline, abandoning");
            }
        });

        let all = futures_util::future::join_all(closes);
        if tokio::time::timeout(SHUTDOWN_DEADLINE, all).await.is_err() {
            tracing::warn!("server manager shutdown exceeded its hub-wide deadline");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn servers_file() -> McpServersFile {
        let mut mcp_servers = Map::new();
        mcp_servers.insert(
            "ghost".to_string(),
            mcphub_domain::config::ServerConfig::Stdio {
                command: "__definitely_not_a_real_binary__".into(),
                args: vec![],
                env: Map::new(),
                enabled: true,
            },
        );
        McpServersFile { mcp_servers }
    }

    #[tokio::test]
    async fn initialize_records_failures_without_panicking() {
        let manager = ServerManager::initialize(&servers_file()).await;
        assert_eq!(manager.server_count(), 1);
        assert_eq!(manager.connected_count().await, 0);
    }

    #[tokio::test]
    async fn get_server_tools_unknown_id_is_not_found() {
        let manager = ServerManager::initialize(&servers_file()).await;
        let err = manager.get_server_tools("nope").await.unwrap_err();
        assert_eq!(err.code(), "ServerNotFound");
    }

    #[tokio::test]
    async fn shutdown_completes_without_hanging() {
        let manager = ServerManager::initialize(&servers_file()).await;
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn set_message_tracker_does_not_panic_on_unconnected_servers() {
        let manager = ServerManager::initialize(&servers_file()).await;
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        manager
            .set_message_tracker(Arc::new(move |server_id: &str, _dir, method: &str, _payload| {
                seen2.lock().push((server_id.to_string(), method.to_string()));
            }))
            .await;
        // The lone server never connected, so nothing was sent; installing
        // the tracker itself must still succeed.
        assert!(seen.lock().is_empty());
    }
}
