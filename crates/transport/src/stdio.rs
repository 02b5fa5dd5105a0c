//! Stdio transport: spawns a child process and speaks newline-delimited
//! JSON-RPC over its stdin/stdout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use crate::error::TransportError;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{McpTransport, MessageDirection, MessageTap, MAX_MESSAGE_BYTES};

/// Maximum number of non-JSON lines to skip before declaring the server broken.
const MAX_SKIP_LINES: usize = 1000;

/// Serializes the whole request/response cycle so concurrent callers never
/// read each other's responses; stdio has no multiplexing of its own.
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    child: Mutex<Child>,
    request_lock: Mutex<()>,
    next_id: AtomicU64,
    alive: AtomicBool,
    message_tap: parking_lot::RwLock<Option<MessageTap>>,
}

impl StdioTransport {
    pub fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self, TransportError> {
        let mut cmd = tokio::process::Command::new(command);
        cmd.args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(TransportError::from)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::spawn("failed to capture child stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::spawn("failed to capture child stdout"))?;

        // Drain stderr at DEBUG so a chatty server doesn't block on a full pipe.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(line = %line, "mcp server stderr");
                }
            });
        }

        Ok(Self {
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            child: Mutex::new(child),
            request_lock: Mutex::new(()),
            next_id: AtomicU64::new(1),
            alive: AtomicBool::new(true),
            message_tap: parking_lot::RwLock::new(None),
        })
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn tap(&self, direction: MessageDirection, method: &str, payload: &Value) {
        if let Some(f) = self.message_tap.read().as_ref() {
            f(direction, method, payload);
        }
    }

    async fn write_line(&self, json: &str) -> Result<(), TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::network("process has exited"));
        }
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(json.as_bytes()).await.map_err(TransportError::from)?;
        stdin.write_all(b"\n").await.map_err(TransportError::from)?;
        stdin.flush().await.map_err(TransportError::from)?;
        Ok(())
    }

    async fn read_line(&self) -> Result<String, TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::network("process has exited"));
        }
        let mut stdout = self.stdout.lock().await;
        let mut skipped = 0usize;
        loop {
            let mut line = String::new();
            let bytes_read = stdout.read_line(&mut line).await.map_err(TransportError::from)?;
            if bytes_read == 0 {
                self.alive.store(false, Ordering::SeqCst);
                return Err(TransportError::network("process has exited"));
            }
            if line.len() > MAX_MESSAGE_BYTES {
                return Err(TransportError::too_large(format!("{} bytes", line.len())));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('{') {
                return Ok(trimmed.to_string());
            }
            skipped += 1;
            if skipped >= MAX_SKIP_LINES {
                self.alive.store(false, Ordering::SeqCst);
                return Err(TransportError::protocol(
                    "server produced too many non-JSON lines on stdout",
                ));
            }
            tracing::debug!(line = %trimmed, "skipping non-JSON line from mcp server stdout");
        }
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn start(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TransportError> {
        let _guard = self.request_lock.lock().await;

        let id = self.next_request_id();
        let req = JsonRpcRequest::new(id, method, params);
        let json = serde_json::to_string(&req)?;

        tracing::debug!(id, method, "sending mcp request");
        self.write_line(&json).await?;
        self.tap(MessageDirection::Outbound, method, &serde_json::to_value(&req).unwrap_or(Value::Null));

        let timeout = tokio::time::Duration::from_secs(30);
        let result = tokio::time::timeout(timeout, async {
            loop {
                let line = self.read_line().await?;
                if let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(&line) {
                    if resp.id == id {
                        return Ok(resp);
                    }
                    tracing::debug!(expected_id = id, got_id = resp.id, "response for different request, continuing");
                }
            }
        })
        .await;

        match result {
            Ok(inner) => {
                if let Ok(resp) = &inner {
                    self.tap(MessageDirection::Inbound, method, &serde_json::to_value(resp).unwrap_or(Value::Null));
                }
                inner
            }
            Err(_) => Err(TransportError::network("timeout waiting for response")),
        }
    }

    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        let mut notif = JsonRpcNotification::new(method);
        notif.params = params;
        let json = serde_json::to_string(&notif)?;
        tracing::debug!(method, "sending mcp notification");
        self.write_line(&json).await?;
        self.tap(MessageDirection::Outbound, method, &serde_json::to_value(&notif).unwrap_or(Value::Null));
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn set_message_tap(&self, tap: MessageTap) {
        *self.message_tap.write() = Some(tap);
    }

    async fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let mut child = self.child.lock().await;
        {
            let mut stdin = self.stdin.lock().await;
            if let Err(e) = stdin.shutdown().await {
                tracing::debug!(error = %e, "error closing mcp server stdin");
            }
        }
        let wait = tokio::time::timeout(tokio::time::Duration::from_secs(2), child.wait()).await;
        match wait {
            Ok(Ok(status)) => tracing::debug!(?status, "mcp server process exited"),
            Ok(Err(e)) => tracing::warn!(error = %e, "error waiting for mcp server process"),
            Err(_) => {
                tracing::warn!("mcp server process did not exit within timeout, killing");
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill mcp server process");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_missing_binary_returns_spawn_error() {
        let result = StdioTransport::spawn("__definitely_not_a_real_binary__", &[], &HashMap::new());
        assert!(result.is_err());
    }
}
