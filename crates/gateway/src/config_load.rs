//! Assembles a [`HubConfig`] from the on-disk config directory:
//! `mcp_server.json`, `group.json`, `api_tool.json`, and an optional
//! `hub.toml` for the listener and runtime tunables.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mcphub_domain::config::{ApiToolsFile, ConfigSeverity, GroupsFile, HubConfig, ListenConfig, McpServersFile, RuntimeConfig};

pub fn load_hub_config(config_dir: &Path) -> anyhow::Result<HubConfig> {
    let mcp_servers = read_json_or_default::<McpServersFile>(&config_dir.join("mcp_server.json"))?;
    let groups = read_json_or_default::<GroupsFile>(&config_dir.join("group.json"))?;
    let api_tools = read_json_or_default::<ApiToolsFile>(&config_dir.join("api_tool.json"))?;
    let (listen, runtime) = read_hub_toml(&config_dir.join("hub.toml"))?;

    let mut config = HubConfig {
        listen,
        mcp_servers,
        groups,
        api_tools,
        runtime,
    };
    config.runtime.apply_env_overrides();

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    Ok(config)
}

fn read_json_or_default<T: Default + serde::de::DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

#[derive(Default, serde::Deserialize)]
struct HubToml {
    #[serde(default)]
    listen: Option<ListenConfig>,
    #[serde(default)]
    runtime: Option<RuntimeConfig>,
}

fn read_hub_toml(path: &PathBuf) -> anyhow::Result<(ListenConfig, RuntimeConfig)> {
    if !path.exists() {
        return Ok((ListenConfig::default(), RuntimeConfig::default()));
    }
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed: HubToml = toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok((parsed.listen.unwrap_or_default(), parsed.runtime.unwrap_or_default()))
}
