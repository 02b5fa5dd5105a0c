//! `mcphub-servers` — downstream MCP server connections and the manager
//! that supervises them.
//!
//! This crate provides:
//! - [`ServerConnection`], one per configured downstream server, with its
//!   `DISCONNECTED → CONNECTING → CONNECTED/ERROR` state machine.
//! - [`ServerManager`], which owns every connection, drives the concurrent
//!   initial connect pass, and schedules exponential-backoff reconnects.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcphub_servers::ServerManager;
//!
//! let manager = ServerManager::initialize(&config.mcp_servers).await;
//! for server in manager.get_all_servers().await {
//!     println!("{}: {}", server.id, server.state_label);
//! }
//! let result = manager.call_tool("filesystem", "read_file", json!({"path": "/tmp"})).await?;
//! ```

pub mod connection;
pub mod manager;
pub mod reconnect;

pub use connection::{ConnectionState, MessageTracker, ServerConnection};
pub use manager::{ServerManager, ServerSnapshot};
pub use reconnect::BackoffPolicy;
