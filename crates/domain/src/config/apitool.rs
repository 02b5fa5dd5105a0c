//! API-to-MCP tool configuration (`api_tool.json`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level document for `api_tool.json`: `{ id: ApiToolConfig }`.
pub type ApiToolsFile = HashMap<String, ApiToolConfig>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToolConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema")]
    pub input_schema: serde_json::Value,
    pub api: ApiSpec,
    #[serde(default)]
    pub response: Option<ResponseSpec>,
    #[serde(default)]
    pub security: SecuritySpec,
    #[serde(default = "d_true")]
    pub enabled: bool,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

fn d_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpec {
    pub method: HttpMethod,
    /// May contain `{{data.x}}` path-segment templates.
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub query: HashMap<String, String>,
    /// Body template; each string leaf may contain `{{data.x}}`/`{{env.X}}`.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

fn d_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSpec {
    /// JSONata expression applied to the raw HTTP response body.
    #[serde(default)]
    pub transform: Option<String>,
    /// Dotted path into an error response body to extract a message from,
    /// tried before the engine's built-in common-field probing.
    #[serde(default)]
    pub error_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySpec {
    /// Hostnames this tool is permitted to call. Empty means the engine
    /// derives a single-entry whitelist from `api.url`'s own host.
    #[serde(default)]
    pub domain_whitelist: Vec<String>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitSpec>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSpec {
    pub requests: u32,
    pub window_secs: u64,
}

impl ApiToolConfig {
    pub fn effective_domain_whitelist(&self) -> Vec<String> {
        if !self.security.domain_whitelist.is_empty() {
            return self.security.domain_whitelist.clone();
        }
        url::Url::parse(&self.api.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| vec![h.to_string()]))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_api_tool() {
        let raw = r#"{
            "id": "weather",
            "name": "get_weather",
            "api": { "method": "GET", "url": "https://api.example.com/weather/{{data.city}}" }
        }"#;
        let cfg: ApiToolConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.api.method, HttpMethod::Get);
        assert!(cfg.enabled);
        assert_eq!(cfg.api.timeout_ms, 30_000);
    }

    #[test]
    fn domain_whitelist_falls_back_to_url_host() {
        let raw = r#"{
            "id": "weather",
            "name": "get_weather",
            "api": { "method": "GET", "url": "https://api.example.com/weather" }
        }"#;
        let cfg: ApiToolConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.effective_domain_whitelist(), vec!["api.example.com".to_string()]);
    }

    #[test]
    fn response_spec_parses_transform_and_error_path() {
        let raw = r#"{
            "id": "weather",
            "name": "get_weather",
            "api": { "method": "GET", "url": "https://api.example.com/weather" },
            "response": { "transform": "{ temp: main.temp }", "errorPath": "error.detail" }
        }"#;
        let cfg: ApiToolConfig = serde_json::from_str(raw).unwrap();
        let response = cfg.response.unwrap();
        assert_eq!(response.transform.as_deref(), Some("{ temp: main.temp }"));
        assert_eq!(response.error_path.as_deref(), Some("error.detail"));
    }

    #[test]
    fn explicit_domain_whitelist_wins() {
        let raw = r#"{
            "id": "weather",
            "name": "get_weather",
            "api": { "method": "GET", "url": "https://api.example.com/weather" },
            "security": { "domainWhitelist": ["other.example.com"] }
        }"#;
        let cfg: ApiToolConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.effective_domain_whitelist(), vec!["other.example.com".to_string()]);
    }
}
