//! Tool catalogue types shared by the server manager, the API-to-MCP
//! engine, the group manager, and the tool manager.

use serde::{Deserialize, Serialize};

/// Where a tool came from. Used to route a `tools/call` back to the right
/// component without the tool manager holding a reference to either one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOrigin {
    /// Sourced from a downstream MCP server connection.
    Mcp { server_id: String },
    /// Synthesized from an API-to-MCP config.
    Api { config_id: String },
}

/// A single catalogued tool. `name` is globally unique across the hub —
/// see the collision policy in the catalogue crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema", rename = "inputSchema")]
    pub input_schema: serde_json::Value,
    #[serde(skip)]
    pub origin: ToolOriginPlaceholder,
}

/// `Tool::origin` needs `Default` so the struct can round-trip through
/// `serde_json::from_value` when deserializing a bare MCP `tools/list`
/// payload (which carries no origin); the real origin is attached by
/// whichever component discovered the tool.
pub type ToolOriginPlaceholder = Option<ToolOrigin>;

fn default_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl Tool {
    pub fn with_origin(mut self, origin: ToolOrigin) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// A single content item in a `tools/call` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResultContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "json")]
    Json { data: serde_json::Value },
}

/// The result of a `tools/call`, normalized from whichever backend
/// (downstream MCP server or API-to-MCP engine) produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ToolResultContent>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn json(data: serde_json::Value) -> Self {
        Self {
            content: vec![ToolResultContent::Json { data }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent::Text { text: text.into() }],
            is_error: true,
        }
    }
}

/// Result payload of `tools/list`, as returned by a downstream MCP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsListResult {
    pub tools: Vec<Tool>,
}
