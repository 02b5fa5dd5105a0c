//! Streamable HTTP transport: each JSON-RPC request/response is a single
//! POST round-trip. No session affinity — every call is independent,
//! so there is nothing to reconnect and no background task to run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{McpTransport, MessageDirection, MessageTap, MAX_MESSAGE_BYTES};

pub struct StreamableHttpTransport {
    client: reqwest::Client,
    url: String,
    headers: HashMap<String, String>,
    next_id: AtomicU64,
    alive: AtomicBool,
    message_tap: parking_lot::RwLock<Option<MessageTap>>,
}

impl StreamableHttpTransport {
    pub fn new(url: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            headers,
            next_id: AtomicU64::new(1),
            alive: AtomicBool::new(false),
            message_tap: parking_lot::RwLock::new(None),
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn tap(&self, direction: MessageDirection, method: &str, payload: &Value) {
        if let Some(f) = self.message_tap.read().as_ref() {
            f(direction, method, payload);
        }
    }

    async fn post(&self, body: &str) -> Result<String, TransportError> {
        let mut req = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .timeout(Duration::from_secs(30));
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req.body(body.to_string()).send().await?;
        if !resp.status().is_success() {
            return Err(TransportError::network(format!("status {}", resp.status())));
        }
        let text = resp.text().await?;
        if text.len() > MAX_MESSAGE_BYTES {
            return Err(TransportError::too_large(format!("{} bytes", text.len())));
        }
        Ok(text)
    }
}

#[async_trait]
impl McpTransport for StreamableHttpTransport {
    async fn start(&self) -> Result<(), TransportError> {
        self.alive.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TransportError> {
        let id = self.next_request_id();
        let req = JsonRpcRequest::new(id, method, params);
        let body = serde_json::to_string(&req)?;
        self.tap(MessageDirection::Outbound, method, &serde_json::to_value(&req).unwrap_or(Value::Null));
        let text = self.post(&body).await.inspect_err(|_| {
            self.alive.store(false, Ordering::SeqCst);
        })?;
        let resp: JsonRpcResponse = serde_json::from_str(&text)
            .map_err(|e| TransportError::framing(e.to_string()))?;
        if resp.id != id {
            return Err(TransportError::protocol(format!(
                "response id {} does not match request id {id}",
                resp.id
            )));
        }
        self.alive.store(true, Ordering::SeqCst);
        self.tap(MessageDirection::Inbound, method, &serde_json::to_value(&resp).unwrap_or(Value::Null));
        Ok(resp)
    }

    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        let mut notif = JsonRpcNotification::new(method);
        notif.params = params;
        let body = serde_json::to_string(&notif)?;
        self.post(&body).await?;
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
    }
}
