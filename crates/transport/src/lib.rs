//! `mcphub-transport` — MCP transport adapters.
//!
//! This crate provides:
//! - JSON-RPC 2.0 protocol types for communicating with MCP servers.
//! - A uniform [`McpTransport`] trait (`start`/`send_request`/
//!   `send_notification`/`close`) implemented by three carriers:
//!   [`StdioTransport`] (child process over stdin/stdout), [`SseTransport`]
//!   (GET stream + POST session endpoint), and [`StreamableHttpTransport`]
//!   (one POST round-trip per call, no session affinity).
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcphub_transport::{McpTransport, StdioTransport};
//!
//! let transport = StdioTransport::spawn("npx", &args, &env)?;
//! transport.start().await?;
//! let resp = transport.send_request("tools/list", None).await?;
//! ```

pub mod error;
pub mod protocol;
pub mod sse;
pub mod stdio;
pub mod streamable_http;
pub mod transport;

pub use error::{TransportError, TransportErrorKind};
pub use protocol::{initialize_params, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
pub use sse::SseTransport;
pub use stdio::StdioTransport;
pub use streamable_http::StreamableHttpTransport;
pub use transport::{MessageDirection, MessageTap, McpTransport, MAX_MESSAGE_BYTES};
