//! Group configuration (`group.json`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level document for `group.json`: `{ id: GroupConfig }`.
pub type GroupsFile = HashMap<String, GroupConfig>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Server ids this group exposes. Empty together with `tools` empty
    /// means "all known servers" only when explicitly marked via
    /// [`GroupConfig::is_default`] — an ordinary group with an empty
    /// `servers` list exposes nothing.
    #[serde(default)]
    pub servers: Vec<String>,
    /// Tool name allow-list. Empty means "no filter" (expose all tools
    /// of the referenced servers).
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub validation: Option<GroupValidation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupValidation {
    pub enabled: bool,
    #[serde(default)]
    pub key_hash: Option<String>,
    pub created_at: String,
    pub last_updated: String,
}

impl GroupConfig {
    /// The well-known id for the implicit catch-all group that exposes every
    /// connected server when no `group.json` entries apply.
    pub const DEFAULT_ID: &'static str = "default";

    pub fn is_default(&self) -> bool {
        self.id == Self::DEFAULT_ID
    }

    pub fn requires_key(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.enabled)
    }

    /// Build the fallback group retained when validation drops every
    /// server reference: empty servers, empty tools, no key.
    pub fn fallback(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: Some("fallback group — original references were invalid".into()),
            servers: Vec::new(),
            tools: Vec::new(),
            validation: None,
        }
    }
}
