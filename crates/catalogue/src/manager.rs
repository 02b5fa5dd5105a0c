//! Tool manager (C6): aggregates tools from the server manager and the
//! API-to-MCP engine, applies each group's filters, dispatches calls, and
//! caches the assembled catalogue per group.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use mcphub_apitools::ApiToolEngine;
use mcphub_domain::config::ApiToolConfig;
use mcphub_domain::{HubError, Tool, ToolResult};
use mcphub_groups::{GroupManager, ToolFilter};
use mcphub_servers::ServerManager;
use serde_json::Value;

use crate::cache::{CacheStats, CatalogueCache};

enum ToolOriginResolved {
    Mcp(String),
    Api(String),
}

pub struct ToolManager {
    server_manager: Arc<ServerManager>,
    group_manager: Arc<GroupManager>,
    api_tools: HashMap<String, ApiToolConfig>,
    api_engine: Arc<ApiToolEngine>,
    cache: CatalogueCache,
}

const DEFAULT_TTL: Duration = Duration::from_secs(60);

impl ToolManager {
    pub fn new(
        server_manager: Arc<ServerManager>,
        group_manager: Arc<GroupManager>,
        api_tools: HashMap<String, ApiToolConfig>,
        api_engine: Arc<ApiToolEngine>,
    ) -> Self {
        Self {
            server_manager,
            group_manager,
            api_tools,
            api_engine,
            cache: CatalogueCache::new(DEFAULT_TTL),
        }
    }

    /// `getToolsForGroup`: resolve the group, gather tools from its
    /// connected servers, merge in API-synthesised tools, apply the
    /// allow-list, and return the deduplicated, first-registration-wins
    /// list. Served from cache when fresh.
    pub async fn get_tools_for_group(&self, group_id: &str) -> Result<Vec<Tool>, HubError> {
        if let Some(cached) = self.cache.get(group_id) {
            return Ok(cached);
        }

        let servers = self.group_manager.get_group_servers(group_id)?;
        let filter = self.group_manager.get_group_tools(group_id)?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut tools = Vec::new();

        for server_id in &servers {
            if let Some(config) = self.api_tools.get(server_id) {
                let tool = ApiToolEngine::tool_for(config);
                if !filter.allows(&tool.name) {
                    continue;
                }
                if seen.contains(&tool.name) {
                    tracing::error!(tool = %tool.name, "api tool name collides with an already-registered mcp tool, dropping");
                    continue;
                }
                seen.insert(tool.name.clone());
                tools.push(tool);
                continue;
            }

            let Ok(server_tools) = self.server_manager.get_server_tools(server_id).await else {
                continue;
            };
            for tool in server_tools {
                if !filter.allows(&tool.name) {
                    continue;
                }
                if seen.contains(&tool.name) {
                    tracing::warn!(tool = %tool.name, server = %server_id, "duplicate tool name, first registration wins");
                    continue;
                }
                seen.insert(tool.name.clone());
                tools.push(tool);
            }
        }

        self.cache.put(group_id, tools.clone());
        Ok(tools)
    }

    /// `executeTool`: resolve the tool's origin within the group, dispatch,
    /// and normalise the result. Access is re-validated here (not just at
    /// catalogue build time) so a revoked group key or a server that
    /// dropped mid-flight is caught on the hot path too.
    pub async fn execute_tool(&self, group_id: &str, tool_name: &str, args: Value, client_id: Option<&str>) -> Result<ToolResult, HubError> {
        self.group_manager.validate_tool_access(group_id, tool_name).await?;

        match self.resolve_origin(group_id, tool_name).await? {
            ToolOriginResolved::Api(config_id) => {
                let config = self
                    .api_tools
                    .get(&config_id)
                    .ok_or_else(|| HubError::ToolNotFound(tool_name.to_string()))?;
                self.api_engine.execute(config, client_id, args).await
            }
            ToolOriginResolved::Mcp(server_id) => self.server_manager.call_tool(&server_id, tool_name, args).await,
        }
    }

    async fn resolve_origin(&self, group_id: &str, tool_name: &str) -> Result<ToolOriginResolved, HubError> {
        let servers = self.group_manager.get_group_servers(group_id)?;
        for server_id in &servers {
            if let Some(config) = self.api_tools.get(server_id) {
                if config.name == tool_name {
                    return Ok(ToolOriginResolved::Api(server_id.clone()));
                }
                continue;
            }
            if let Ok(tools) = self.server_manager.get_server_tools(server_id).await {
                if tools.iter().any(|t| t.name == tool_name) {
                    return Ok(ToolOriginResolved::Mcp(server_id.clone()));
                }
            }
        }
        Err(HubError::NoServersAvailable(group_id.to_string()))
    }

    /// Invalidate one group's cached catalogue — call on group edit.
    pub fn invalidate_group(&self, group_id: &str) {
        self.cache.invalidate(group_id);
    }

    /// Invalidate every cached catalogue — call on any server status
    /// transition or API config reload, since either can change what's
    /// visible in every group at once.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcphub_domain::config::{GroupConfig, GroupsFile};

    async fn group_manager_with(servers: Vec<&str>, tools: Vec<&str>) -> Arc<GroupManager> {
        let mut file = GroupsFile::new();
        file.insert(
            "g1".into(),
            GroupConfig {
                id: "g1".into(),
                name: "g1".into(),
                description: None,
                servers: servers.into_iter().map(String::from).collect(),
                tools: tools.into_iter().map(String::from).collect(),
                validation: None,
            },
        );
        Arc::new(GroupManager::new(&file, &HashSet::new(), Arc::new(ServerManager::empty()), HashMap::new()).await)
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let gm = group_manager_with(vec![], vec![]).await;
        let tm = ToolManager::new(Arc::new(ServerManager::empty()), gm, HashMap::new(), Arc::new(ApiToolEngine::new()));
        let err = tm.get_tools_for_group("nope").await.unwrap_err();
        assert_eq!(err.code(), "GroupNotFound");
    }

    #[tokio::test]
    async fn empty_group_resolves_to_empty_tool_list() {
        let gm = group_manager_with(vec![], vec![]).await;
        let tm = ToolManager::new(Arc::new(ServerManager::empty()), gm, HashMap::new(), Arc::new(ApiToolEngine::new()));
        let tools = tm.get_tools_for_group("g1").await.unwrap();
        assert!(tools.is_empty());
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let gm = group_manager_with(vec![], vec![]).await;
        let tm = ToolManager::new(Arc::new(ServerManager::empty()), gm, HashMap::new(), Arc::new(ApiToolEngine::new()));
        tm.get_tools_for_group("g1").await.unwrap();
        tm.get_tools_for_group("g1").await.unwrap();
        assert_eq!(tm.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn execute_tool_on_empty_group_is_no_servers_available() {
        let gm = group_manager_with(vec![], vec!["echo"]).await;
        let tm = ToolManager::new(Arc::new(ServerManager::empty()), gm, HashMap::new(), Arc::new(ApiToolEngine::new()));
        let err = tm.execute_tool("g1", "echo", serde_json::json!({}), None).await.unwrap_err();
        assert_eq!(err.code(), "NoServersAvailable");
    }
}
