//! Downstream MCP server configuration (`mcp_server.json`).
//!
//! The canonical definitions live here so that the server manager, the
//! group manager, and the gateway's config loader can all speak the same
//! type without a cyclic crate dependency.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level document for `mcp_server.json`: `{ "mcpServers": { id: ServerConfig } }`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpServersFile {
    #[serde(default, rename = "mcpServers")]
    pub mcp_servers: HashMap<String, ServerConfig>,
}

/// One downstream MCP server definition. Tagged by `transport`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "kebab-case")]
pub enum ServerConfig {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default = "d_true")]
        enabled: bool,
    },
    #[serde(rename = "http-sse")]
    HttpSse {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default = "d_true")]
        enabled: bool,
    },
    #[serde(rename = "http-stream")]
    HttpStream {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default = "d_true")]
        enabled: bool,
    },
}

fn d_true() -> bool {
    true
}

impl ServerConfig {
    pub fn enabled(&self) -> bool {
        match self {
            ServerConfig::Stdio { enabled, .. }
            | ServerConfig::HttpSse { enabled, .. }
            | ServerConfig::HttpStream { enabled, .. } => *enabled,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerConfig::Stdio { .. } => "stdio",
            ServerConfig::HttpSse { .. } => "http-sse",
            ServerConfig::HttpStream { .. } => "http-stream",
        }
    }
}
