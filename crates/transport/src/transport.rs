//! The `McpTransport` trait: a uniform capability set (`start`, `send`,
//! `close`) shared by stdio, SSE, and streamable HTTP carriers.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::protocol::JsonRpcResponse;

/// A tap invoked with every JSON-RPC request/response/notification that
/// crosses this transport, keyed by direction and method name. Installed by
/// the server manager for message-trace observability; transports do not
/// interpret the payload.
pub type MessageTap = std::sync::Arc<dyn Fn(MessageDirection, &str, &Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    Outbound,
    Inbound,
}

/// Maximum inbound message size before a transport fails the message (not
/// the whole connection) with `TransportErrorKind::TooLarge`.
pub const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Establish the underlying carrier (spawn the process / open the
    /// stream). Idempotent: calling twice on an already-started transport
    /// is a no-op.
    async fn start(&self) -> Result<(), TransportError>;

    /// Send a JSON-RPC request and wait for the matching response.
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TransportError>;

    /// Send a JSON-RPC notification (no response expected).
    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), TransportError>;

    /// Whether the underlying carrier is still usable.
    fn is_alive(&self) -> bool;

    /// Install a tap invoked with every request/response/notification this
    /// transport actually sends or receives from here on. Replaces any
    /// previously installed tap.
    fn set_message_tap(&self, tap: MessageTap);

    /// Tear down the carrier. Best-effort; never panics.
    async fn close(&self);
}
