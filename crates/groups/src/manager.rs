//! Group manager (C5): named subsets of servers and tools, with an
//! optional hashed access key gating visibility.
//!
//! Ownership note: this manager holds only server *ids*; connectivity and
//! tool exports are always resolved through the injected [`ServerManager`]
//! rather than cached here, so a server reconnect is visible immediately.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use mcphub_domain::config::{GroupConfig, GroupValidation, GroupsFile};
use mcphub_domain::HubError;
use mcphub_servers::ServerManager;
use parking_lot::RwLock;

use crate::key;

/// What a group's `tools` allow-list resolves to.
#[derive(Debug, Clone)]
pub enum ToolFilter {
    All,
    Named(HashSet<String>),
}

impl ToolFilter {
    pub fn allows(&self, tool_name: &str) -> bool {
        match self {
            ToolFilter::All => true,
            ToolFilter::Named(names) => names.contains(tool_name),
        }
    }
}

pub struct GroupHealthReport {
    pub total_groups: usize,
    pub fallback_groups: usize,
}

pub struct GroupManager {
    groups: RwLock<HashMap<String, GroupConfig>>,
    server_manager: Arc<ServerManager>,
    /// Synthetic server id (the API tool config's own id) → tool name it
    /// exports. An API tool is always considered "connected".
    api_tool_exports: HashMap<String, String>,
}

impl GroupManager {
    /// Sanitize `groups_file` against `known_server_ids` (real downstream
    /// servers) and the API tool config ids in `api_tool_exports`: drop
    /// dangling server references with a warning, demote a group to
    /// [`GroupConfig::fallback`] when none of its references survive, and
    /// drop `tools` allow-list entries absent from every valid referenced
    /// server's current export list (also with a warning).
    pub async fn new(
        groups_file: &GroupsFile,
        known_server_ids: &HashSet<String>,
        server_manager: Arc<ServerManager>,
        api_tool_exports: HashMap<String, String>,
    ) -> Self {
        let mut sanitized = HashMap::with_capacity(groups_file.len());
        for (key, group) in groups_file {
            let valid_servers: Vec<String> = group
                .servers
                .iter()
                .filter(|id| {
                    let known = known_server_ids.contains(*id) || api_tool_exports.contains_key(*id);
                    if !known {
                        tracing::warn!(group = %key, server = %id, "group references unknown server, dropping");
                    }
                    known
                })
                .cloned()
                .collect();

            let mut sanitized_group = if valid_servers.is_empty() && !group.servers.is_empty() {
                tracing::warn!(group = %key, "no valid server references remain, demoting to fallback group");
                GroupConfig::fallback(group.id.clone())
            } else {
                GroupConfig {
                    servers: valid_servers,
                    ..group.clone()
                }
            };

            if !sanitized_group.tools.is_empty() && !sanitized_group.servers.is_empty() {
                let mut exported = HashSet::new();
                for server_id in &sanitized_group.servers {
                    if let Some(name) = api_tool_exports.get(server_id) {
                        exported.insert(name.clone());
                        continue;
                    }
                    if let Ok(tools) = server_manager.get_server_tools(server_id).await {
                        exported.extend(tools.into_iter().map(|t| t.name));
                    }
                }
                sanitized_group.tools.retain(|name| {
                    let ok = exported.contains(name);
                    if !ok {
                        tracing::warn!(group = %key, tool = %name, "group references tool absent from its servers, dropping");
                    }
                    ok
                });
            }

            sanitized.insert(key.clone(), sanitized_group);
        }

        Self {
            groups: RwLock::new(sanitized),
            server_manager,
            api_tool_exports,
        }
    }

    pub fn get_group(&self, id: &str) -> Option<GroupConfig> {
        self.groups.read().get(id).cloned()
    }

    pub fn get_all_groups(&self) -> Vec<GroupConfig> {
        self.groups.read().values().cloned().collect()
    }

    pub fn get_group_servers(&self, id: &str) -> Result<Vec<String>, HubError> {
        self.get_group(id).map(|g| g.servers).ok_or_else(|| HubError::GroupNotFound(id.to_string()))
    }

    pub fn get_group_tools(&self, id: &str) -> Result<ToolFilter, HubError> {
        let group = self.get_group(id).ok_or_else(|| HubError::GroupNotFound(id.to_string()))?;
        Ok(if group.tools.is_empty() {
            ToolFilter::All
        } else {
            ToolFilter::Named(group.tools.into_iter().collect())
        })
    }

    /// Config-level allow-list check only; does not consult connectivity.
    pub fn find_tool_in_group(&self, id: &str, tool_name: &str) -> Result<bool, HubError> {
        Ok(self.get_group_tools(id)?.allows(tool_name))
    }

    /// The full tool-access rule: the name must pass the group's allow-list
    /// *and* at least one referenced server must be connected and actually
    /// export that tool.
    pub async fn validate_tool_access(&self, id: &str, tool_name: &str) -> Result<(), HubError> {
        let group = self.get_group(id).ok_or_else(|| HubError::GroupNotFound(id.to_string()))?;

        let filter = if group.tools.is_empty() {
            ToolFilter::All
        } else {
            ToolFilter::Named(group.tools.iter().cloned().collect())
        };
        if !filter.allows(tool_name) {
            return Err(HubError::ToolNotFound(tool_name.to_string()));
        }

        for server_id in &group.servers {
            if let Some(exported) = self.api_tool_exports.get(server_id) {
                if exported == tool_name {
                    return Ok(());
                }
                continue;
            }
            if let Ok(tools) = self.server_manager.get_server_tools(server_id).await {
                if tools.iter().any(|t| t.name == tool_name) {
                    return Ok(());
                }
            }
        }

        Err(HubError::NoServersAvailable(id.to_string()))
    }

    pub fn health(&self) -> GroupHealthReport {
        let groups = self.groups.read();
        GroupHealthReport {
            total_groups: groups.len(),
            fallback_groups: groups.values().filter(|g| g.servers.is_empty() && g.tools.is_empty()).count(),
        }
    }

    /// Set (or overwrite) a group's access key, hashing the plaintext and
    /// stamping fresh `createdAt`/`lastUpdated` metadata.
    pub fn set_key(&self, id: &str, plaintext: &str) -> Result<(), HubError> {
        let mut groups = self.groups.write();
        let group = groups.get_mut(id).ok_or_else(|| HubError::GroupNotFound(id.to_string()))?;
        let now = Utc::now().to_rfc3339();
        group.validation = Some(GroupValidation {
            enabled: true,
            key_hash: Some(key::hash_key(plaintext)),
            created_at: now.clone(),
            last_updated: now,
        });
        Ok(())
    }

    /// Rotate the key's hash in place, preserving `createdAt`.
    pub fn rotate_key(&self, id: &str, plaintext: &str) -> Result<(), HubError> {
        let mut groups = self.groups.write();
        let group = groups.get_mut(id).ok_or_else(|| HubError::GroupNotFound(id.to_string()))?;
        let created_at = group
            .validation
            .as_ref()
            .map(|v| v.created_at.clone())
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        group.validation = Some(GroupValidation {
            enabled: true,
            key_hash: Some(key::hash_key(plaintext)),
            created_at,
            last_updated: Utc::now().to_rfc3339(),
        });
        Ok(())
    }

    pub fn delete_key(&self, id: &str) -> Result<(), HubError> {
        let mut groups = self.groups.write();
        let group = groups.get_mut(id).ok_or_else(|| HubError::GroupNotFound(id.to_string()))?;
        group.validation = None;
        Ok(())
    }

    /// `true` when no key is required, or the provided key matches.
    pub fn verify_key(&self, id: &str, provided: Option<&str>) -> Result<bool, HubError> {
        let group = self.get_group(id).ok_or_else(|| HubError::GroupNotFound(id.to_string()))?;
        let Some(validation) = group.validation else {
            return Ok(true);
        };
        if !validation.enabled {
            return Ok(true);
        }
        let Some(expected_hash) = validation.key_hash else {
            return Ok(false);
        };
        let Some(provided) = provided else {
            return Ok(false);
        };
        Ok(key::verify_key(provided, &expected_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_server_manager() -> Arc<ServerManager> {
        Arc::new(ServerManager::empty())
    }

    fn group(id: &str, servers: Vec<&str>, tools: Vec<&str>) -> GroupConfig {
        GroupConfig {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            servers: servers.into_iter().map(String::from).collect(),
            tools: tools.into_iter().map(String::from).collect(),
            validation: None,
        }
    }

    #[tokio::test]
    async fn unknown_server_reference_is_dropped() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec!["known", "ghost"], vec![]));
        let known: HashSet<String> = ["known".to_string()].into_iter().collect();

        let manager = GroupManager::new(&file, &known, empty_server_manager(), HashMap::new()).await;
        let servers = manager.get_group_servers("g1").unwrap();
        assert_eq!(servers, vec!["known".to_string()]);
    }

    #[tokio::test]
    async fn group_with_no_valid_servers_is_demoted_to_fallback() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec!["ghost"], vec!["echo"]));
        let known = HashSet::new();

        let manager = GroupManager::new(&file, &known, empty_server_manager(), HashMap::new()).await;
        let g = manager.get_group("g1").unwrap();
        assert!(g.servers.is_empty());
        assert!(g.tools.is_empty());
    }

    #[tokio::test]
    async fn empty_tools_list_means_no_filter() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec![], vec![]));
        let manager = GroupManager::new(&file, &HashSet::new(), empty_server_manager(), HashMap::new()).await;
        assert!(manager.find_tool_in_group("g1", "anything").unwrap());
    }

    #[tokio::test]
    async fn named_tools_list_restricts_access() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec![], vec!["echo"]));
        let manager = GroupManager::new(&file, &HashSet::new(), empty_server_manager(), HashMap::new()).await;
        assert!(manager.find_tool_in_group("g1", "echo").unwrap());
        assert!(!manager.find_tool_in_group("g1", "other").unwrap());
    }

    #[tokio::test]
    async fn validate_tool_access_allows_api_synthesized_tool() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec!["weather-api"], vec![]));
        let known = HashSet::new();
        let mut api_exports = HashMap::new();
        api_exports.insert("weather-api".to_string(), "get_weather".to_string());

        let manager = GroupManager::new(&file, &known, empty_server_manager(), api_exports).await;
        manager.validate_tool_access("g1", "get_weather").await.unwrap();
    }

    #[tokio::test]
    async fn validate_tool_access_rejects_disallowed_tool_name() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec![], vec!["echo"]));
        let manager = GroupManager::new(&file, &HashSet::new(), empty_server_manager(), HashMap::new()).await;
        let err = manager.validate_tool_access("g1", "not-echo").await.unwrap_err();
        assert_eq!(err.code(), "ToolNotFound");
    }

    #[tokio::test]
    async fn validate_tool_access_rejects_when_no_server_exports_it() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec![], vec![]));
        let manager = GroupManager::new(&file, &HashSet::new(), empty_server_manager(), HashMap::new()).await;
        let err = manager.validate_tool_access("g1", "echo").await.unwrap_err();
        assert_eq!(err.code(), "NoServersAvailable");
    }

    #[tokio::test]
    async fn tools_absent_from_every_referenced_server_are_dropped() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec!["known"], vec!["ghost-tool"]));
        let known: HashSet<String> = ["known".to_string()].into_iter().collect();

        // "known" is a valid server reference but never actually connects in
        // this manager, so it exports no tools and the allow-list entry has
        // nothing to match against.
        let manager = GroupManager::new(&file, &known, empty_server_manager(), HashMap::new()).await;
        let g = manager.get_group("g1").unwrap();
        assert!(g.tools.is_empty());
    }

    #[tokio::test]
    async fn tools_exported_by_an_api_tool_server_survive_pruning() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec!["weather-api"], vec!["get_weather", "ghost-tool"]));
        let mut api_exports = HashMap::new();
        api_exports.insert("weather-api".to_string(), "get_weather".to_string());

        let manager = GroupManager::new(&file, &HashSet::new(), empty_server_manager(), api_exports).await;
        let g = manager.get_group("g1").unwrap();
        assert_eq!(g.tools, vec!["get_weather".to_string()]);
    }

    #[tokio::test]
    async fn set_and_verify_key_round_trips() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec![], vec![]));
        let manager = GroupManager::new(&file, &HashSet::new(), Arc::new(ServerManager::empty()), HashMap::new()).await;

        manager.set_key("g1", "topsecret").unwrap();
        assert!(manager.verify_key("g1", Some("topsecret")).unwrap());
        assert!(!manager.verify_key("g1", Some("wrong")).unwrap());
        assert!(!manager.verify_key("g1", None).unwrap());
    }

    #[tokio::test]
    async fn group_without_validation_requires_no_key() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec![], vec![]));
        let manager = GroupManager::new(&file, &HashSet::new(), Arc::new(ServerManager::empty()), HashMap::new()).await;
        assert!(manager.verify_key("g1", None).unwrap());
    }

    #[tokio::test]
    async fn delete_key_removes_validation_requirement() {
        let mut file = GroupsFile::new();
        file.insert("g1".into(), group("g1", vec![], vec![]));
        let manager = GroupManager::new(&file, &HashSet::new(), Arc::new(ServerManager::empty()), HashMap::new()).await;
        manager.set_key("g1", "topsecret").unwrap();
        manager.delete_key("g1").unwrap();
        assert!(manager.verify_key("g1", None).unwrap());
    }
}
