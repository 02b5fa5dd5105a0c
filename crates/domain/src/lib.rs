//! `mcphub-domain` — shared types for the MCP hub.
//!
//! This crate provides:
//! - The configuration data model for downstream servers, groups, and
//!   API-to-MCP tools (`mcp_server.json`, `group.json`, `api_tool.json`).
//! - The catalogued [`tool::Tool`] type and its call result types, shared
//!   by every component that produces or consumes tools.
//! - The error taxonomy ([`error::HubError`]) and response envelope that
//!   every external-facing response is wrapped in.
//!
//! Downstream crates (`mcphub-servers`, `mcphub-apitools`, `mcphub-groups`,
//! `mcphub-catalogue`, `mcphub-core`, `mcphub-gateway`) depend on this one
//! so that config and error types never have to be duplicated or converted
//! at crate boundaries.

pub mod config;
pub mod error;
pub mod tool;

pub use config::{ApiToolConfig, ApiToolsFile, GroupConfig, GroupsFile, HubConfig, ListenConfig, ServerConfig};
pub use error::{Envelope, ErrorBody, HubError, Result};
pub use tool::{Tool, ToolOrigin, ToolResult, ToolResultContent};
