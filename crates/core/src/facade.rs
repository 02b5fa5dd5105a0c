//! Hub facade (C7): initialisation orchestration, the health loop, message
//! tracing, and idempotent bounded shutdown. The single object C8 talks to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mcphub_apitools::ApiToolEngine;
use mcphub_catalogue::ToolManager;
use mcphub_domain::config::HubConfig;
use mcphub_domain::HubError;
use mcphub_groups::GroupManager;
use mcphub_servers::ServerManager;
use mcphub_transport::MessageDirection;
use parking_lot::RwLock;
use tokio::sync::Notify;

use crate::health::{HealthReport, ServerStatusCounts};
use crate::trace::MessageTrace;

pub struct HubFacade {
    pub server_manager: Arc<ServerManager>,
    pub group_manager: Arc<GroupManager>,
    pub tool_manager: Arc<ToolManager>,
    trace: Arc<MessageTrace>,
    health: RwLock<HealthReport>,
    health_interval: Duration,
    shutdown_signal: Notify,
    shutting_down: AtomicBool,
}

impl HubFacade {
    /// Startup order per the component dependency graph: C3 and C4 build
    /// concurrently (neither depends on the other), then C5, then C6. The
    /// facade only declares itself ready once at least one group loaded —
    /// zero connected servers is logged CRITICAL but not fatal on its own.
    pub async fn init(config: &HubConfig) -> Result<Arc<Self>, HubError> {
        let (server_manager, api_engine) = tokio::join!(
            ServerManager::initialize(&config.mcp_servers),
            async { Arc::new(ApiToolEngine::new()) },
        );

        let known_server_ids: std::collections::HashSet<String> = config
            .mcp_servers
            .mcp_servers
            .iter()
            .filter(|(_, cfg)| cfg.enabled())
            .map(|(id, _)| id.clone())
            .collect();

        let enabled_api_tools: std::collections::HashMap<String, _> =
            config.api_tools.iter().filter(|(_, cfg)| cfg.enabled).map(|(id, cfg)| (id.clone(), cfg.clone())).collect();
        let api_tool_exports: std::collections::HashMap<String, String> =
            enabled_api_tools.iter().map(|(id, cfg)| (id.clone(), cfg.name.clone())).collect();

        let group_manager = Arc::new(GroupManager::new(&config.groups, &known_server_ids, server_manager.clone(), api_tool_exports).await);

        if group_manager.get_all_groups().is_empty() {
            return Err(HubError::Config("no groups loaded, hub cannot become ready".into()));
        }

        let tool_manager = Arc::new(ToolManager::new(server_manager.clone(), group_manager.clone(), enabled_api_tools, api_engine));

        let connected = server_manager.connected_count().await;
        if connected == 0 {
            tracing::error!("no downstream servers connected at startup, hub exposes only API-synthesised tools");
        }

        let facade = Arc::new(Self {
            server_manager,
            group_manager,
            tool_manager,
            trace: Arc::new(MessageTrace::new(config.runtime.trace_capacity)),
            health: RwLock::new(HealthReport::build(ServerStatusCounts::default(), 0, 0)),
            health_interval: Duration::from_secs(config.runtime.health_interval_secs),
            shutdown_signal: Notify::new(),
            shutting_down: AtomicBool::new(false),
        });

        // Wire the trace ring buffer into every downstream connection so it
        // observes real MCP traffic, not just front-end dispatch calls.
        let trace_for_tracker = facade.trace.clone();
        facade
            .server_manager
            .set_message_tracker(Arc::new(move |server_id: &str, direction: MessageDirection, method: &str, payload| {
                trace_for_tracker.record(server_id.to_string(), direction, method.to_string(), payload);
            }))
            .await;

        facade.refresh_health().await;
        facade.clone().spawn_health_loop();

        tracing::info!(connected, groups = facade.group_manager.get_all_groups().len(), "hub facade ready");
        Ok(facade)
    }

    fn spawn_health_loop(self: Arc<Self>) {
        let interval_duration = self.health_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_duration);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if self.shutting_down.load(Ordering::SeqCst) {
                            break;
                        }
                        self.refresh_health().await;
                    }
                    _ = self.shutdown_signal.notified() => break,
                }
            }
        });
    }

    async fn refresh_health(&self) {
        let snapshots = self.server_manager.get_all_servers().await;
        let mut counts = ServerStatusCounts::default();
        for s in &snapshots {
            match s.state_label {
                "connected" => counts.connected += 1,
                "connecting" => counts.connecting += 1,
                "error" => counts.error += 1,
                _ => counts.disconnected += 1,
            }
        }

        let group_health = self.group_manager.health();
        let report = HealthReport::build(counts, group_health.total_groups, group_health.fallback_groups);

        if report.servers.error > 0 {
            self.tool_manager.invalidate_all();
        }

        tracing::debug!(score = report.score, connected = report.servers.connected, error = report.servers.error, "health report computed");
        *self.health.write() = report;
    }

    pub fn health_report(&self) -> HealthReport {
        self.health.read().clone()
    }

    pub fn trace(&self) -> &MessageTrace {
        self.trace.as_ref()
    }

    /// Idempotent, bounded shutdown: a second call while one is already in
    /// flight is a no-op rather than a double-close.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown_signal.notify_waiters();
        self.server_manager.shutdown().await;
        tracing::info!("hub facade shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcphub_domain::config::{GroupConfig, GroupsFile, HubConfig};

    fn config_with_default_group() -> HubConfig {
        let mut groups = GroupsFile::new();
        groups.insert(
            "default".into(),
            GroupConfig {
                id: "default".into(),
                name: "default".into(),
                description: None,
                servers: vec![],
                tools: vec![],
                validation: None,
            },
        );
        HubConfig {
            groups,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn init_fails_without_any_group() {
        let config = HubConfig::default();
        let err = HubFacade::init(&config).await.unwrap_err();
        assert_eq!(err.code(), "ConfigError");
    }

    #[tokio::test]
    async fn init_succeeds_with_a_default_group_and_no_servers() {
        let facade = HubFacade::init(&config_with_default_group()).await.unwrap();
        assert_eq!(facade.health_report().servers.connected, 0);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let facade = HubFacade::init(&config_with_default_group()).await.unwrap();
        facade.shutdown().await;
        facade.shutdown().await;
    }
}
