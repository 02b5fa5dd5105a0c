mod apitool;
mod group;
mod listen;
mod servers;

pub use apitool::*;
pub use group::*;
pub use listen::*;
pub use servers::*;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The hub's process-wide configuration, assembled from `mcp_server.json`,
/// `group.json`, `api_tool.json` and environment overrides (see
/// [`HubConfig::from_env_overrides`]).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HubConfig {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub mcp_servers: McpServersFile,
    #[serde(default)]
    pub groups: GroupsFile,
    #[serde(default)]
    pub api_tools: ApiToolsFile,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Tunables controlled by the environment variables in the deployment
/// contract: `ENABLE_LAZY_LOADING`, `ENABLE_CACHING`, `LOG_LEVEL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "d_true")]
    pub lazy_loading: bool,
    #[serde(default = "d_true")]
    pub caching: bool,
    #[serde(default = "d_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "d_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default = "d_health_interval")]
    pub health_interval_secs: u64,
    #[serde(default = "d_trace_capacity")]
    pub trace_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            lazy_loading: true,
            caching: true,
            cache_ttl_secs: d_cache_ttl(),
            log_level: d_log_level(),
            log_file: None,
            health_interval_secs: d_health_interval(),
            trace_capacity: d_trace_capacity(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_cache_ttl() -> u64 {
    300
}
fn d_log_level() -> String {
    "info".into()
}
fn d_health_interval() -> u64 {
    30
}
fn d_trace_capacity() -> usize {
    1000
}

impl RuntimeConfig {
    /// Apply the env-var overrides named in the deployment contract on top
    /// of whatever `mcp_server.json`-adjacent config produced. Env wins.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ENABLE_LAZY_LOADING") {
            self.lazy_loading = parse_bool_env(&v, self.lazy_loading);
        }
        if let Ok(v) = std::env::var("ENABLE_CACHING") {
            self.caching = parse_bool_env(&v, self.caching);
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            if !v.is_empty() {
                self.log_level = v;
            }
        }
        if let Ok(v) = std::env::var("LOG_FILE") {
            if !v.is_empty() {
                self.log_file = Some(v);
            }
        }
    }
}

fn parse_bool_env(raw: &str, fallback: bool) -> bool {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => fallback,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl HubConfig {
    /// Validate the configuration and return a list of issues. An empty
    /// vec means the config is safe to start from; issues of
    /// [`ConfigSeverity::Error`] should abort startup, warnings should
    /// only be logged (mirrors the health-score degrade-don't-crash
    /// philosophy applied to config instead of runtime health).
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.listen.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "listen.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.listen.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "listen.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.listen.cors.allowed_origins.len() == 1 && self.listen.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "listen.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)".into(),
            });
        }

        // ── mcp_server.json ─────────────────────────────────────────
        for (id, server) in &self.mcp_servers.mcp_servers {
            if id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "mcpServers".into(),
                    message: "server id must not be empty".into(),
                });
            }
            if id.contains(':') {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("mcpServers.{id}"),
                    message: "server id must not contain ':' (used as tool name delimiter)".into(),
                });
            }
            if let ServerConfig::Stdio { command, env, .. } = server {
                if command.is_empty() {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Error,
                        field: format!("mcpServers.{id}.command"),
                        message: "stdio transport requires a non-empty command".into(),
                    });
                }
                for key in env.keys() {
                    if matches!(
                        key.as_str(),
                        "LD_PRELOAD" | "LD_LIBRARY_PATH" | "DYLD_INSERT_LIBRARIES"
                    ) {
                        errors.push(ConfigError {
                            severity: ConfigSeverity::Error,
                            field: format!("mcpServers.{id}.env.{key}"),
                            message: format!("overriding {key} is not permitted for security"),
                        });
                    }
                }
            }
        }

        // ── group.json ──────────────────────────────────────────────
        let known_servers: HashSet<&str> =
            self.mcp_servers.mcp_servers.keys().map(String::as_str).collect();
        for (id, group) in &self.groups {
            if group.id != *id {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("groups.{id}.id"),
                    message: format!(
                        "group key \"{id}\" does not match embedded id \"{}\"",
                        group.id
                    ),
                });
            }
            for server_id in &group.servers {
                if !known_servers.contains(server_id.as_str()) {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Error,
                        field: format!("groups.{id}.servers"),
                        message: format!("references unknown server \"{server_id}\""),
                    });
                }
            }
            if group.requires_key()
                && group
                    .validation
                    .as_ref()
                    .and_then(|v| v.key_hash.as_ref())
                    .map_or(true, |h| h.is_empty())
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("groups.{id}.validation"),
                    message: "validation.enabled is true but keyHash is empty".into(),
                });
            }
        }

        // ── api_tool.json ───────────────────────────────────────────
        let mut seen_tool_names: HashSet<&str> = HashSet::new();
        for (id, tool) in &self.api_tools {
            if tool.id != *id {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("apiTools.{id}.id"),
                    message: format!(
                        "api tool key \"{id}\" does not match embedded id \"{}\"",
                        tool.id
                    ),
                });
            }
            if tool.api.url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("apiTools.{id}.api.url"),
                    message: "url must not be empty".into(),
                });
            }
            if !seen_tool_names.insert(tool.name.as_str()) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("apiTools.{id}.name"),
                    message: format!("duplicate tool name \"{}\"", tool.name),
                });
            }
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> HubConfig {
        let mut mcp_servers = HashMap::new();
        mcp_servers.insert(
            "fs".to_string(),
            ServerConfig::Stdio {
                command: "npx".into(),
                args: vec![],
                env: HashMap::new(),
                enabled: true,
            },
        );
        HubConfig {
            listen: ListenConfig::default(),
            mcp_servers: McpServersFile { mcp_servers },
            groups: HashMap::new(),
            api_tools: HashMap::new(),
            runtime: RuntimeConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        let issues = valid_config().validate();
        let errors: Vec<_> = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn listen_port_zero_is_error() {
        let mut cfg = valid_config();
        cfg.listen.port = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "listen.port" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn group_referencing_unknown_server_is_error() {
        let mut cfg = valid_config();
        cfg.groups.insert(
            "g1".into(),
            GroupConfig {
                id: "g1".into(),
                name: "g1".into(),
                description: None,
                servers: vec!["ghost".into()],
                tools: vec![],
                validation: None,
            },
        );
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "groups.g1.servers" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn group_validation_enabled_without_key_hash_is_error() {
        let mut cfg = valid_config();
        cfg.groups.insert(
            "g1".into(),
            GroupConfig {
                id: "g1".into(),
                name: "g1".into(),
                description: None,
                servers: vec![],
                tools: vec![],
                validation: Some(GroupValidation {
                    enabled: true,
                    key_hash: None,
                    created_at: "now".into(),
                    last_updated: "now".into(),
                }),
            },
        );
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "groups.g1.validation" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn duplicate_api_tool_names_is_error() {
        let mut cfg = valid_config();
        let tool = |id: &str| ApiToolConfig {
            id: id.into(),
            name: "same_name".into(),
            description: String::new(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
            api: ApiSpec {
                method: HttpMethod::Get,
                url: "https://example.com".into(),
                headers: HashMap::new(),
                query: HashMap::new(),
                body: None,
                timeout_ms: 30_000,
            },
            response: None,
            security: SecuritySpec::default(),
            enabled: true,
        };
        cfg.api_tools.insert("t1".into(), tool("t1"));
        cfg.api_tools.insert("t2".into(), tool("t2"));
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.message.contains("duplicate tool name")));
    }

    #[test]
    fn env_overrides_apply_on_top_of_defaults() {
        std::env::set_var("ENABLE_CACHING", "false");
        let mut runtime = RuntimeConfig::default();
        runtime.apply_env_overrides();
        assert!(!runtime.caching);
        std::env::remove_var("ENABLE_CACHING");
    }

    #[test]
    fn config_error_display_format() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "listen.port".into(),
            message: "port must be greater than 0".into(),
        };
        assert_eq!(format!("{err}"), "[ERROR] listen.port: port must be greater than 0");
    }
}
