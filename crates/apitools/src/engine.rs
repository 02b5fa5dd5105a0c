//! Ties the declarative `ApiToolConfig` to an executable `tools/call`:
//! validate → render → whitelist check → rate limit → dispatch → shape.

use std::time::Duration;

use mcphub_domain::config::{ApiSpec, ApiToolConfig, HttpMethod};
use mcphub_domain::{HubError, Tool, ToolOrigin, ToolResult};
use serde_json::Value;

use crate::rate_limit::{RateLimitDecision, RateLimiter};
use crate::response;
use crate::security_log::ToolCallRecord;
use crate::{template, validation, whitelist};

const MAX_REDIRECTS: usize = 5;

pub struct ApiToolEngine {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl Default for ApiToolEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiToolEngine {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .expect("reqwest client construction cannot fail with these settings");
        Self {
            client,
            rate_limiter: RateLimiter::new(),
        }
    }

    /// Build the synthesized tool catalogue entry for a config, so the
    /// catalogue can list it alongside MCP-sourced tools.
    pub fn tool_for(config: &ApiToolConfig) -> Tool {
        Tool {
            name: config.name.clone(),
            description: config.description.clone(),
            input_schema: config.input_schema.clone(),
            origin: None,
        }
        .with_origin(ToolOrigin::Api {
            config_id: config.id.clone(),
        })
    }

    pub async fn execute(&self, config: &ApiToolConfig, client_id: Option<&str>, mut data: Value) -> Result<ToolResult, HubError> {
        let started = std::time::Instant::now();

        validation::apply_defaults(&config.input_schema, &mut data);
        validation::validate_params(&config.input_schema, &data)?;
        let data = validation::strip_additional_properties(&config.input_schema, data);

        if let Some(limit) = &config.security.rate_limit {
            match self
                .rate_limiter
                .check(&config.id, client_id, limit.requests, Duration::from_secs(limit.window_secs))
            {
                RateLimitDecision::Denied(events) => {
                    for event in &events {
                        tracing::warn!(tool_id = %event.tool_id, kind = ?event.kind, severity = ?event.severity, "security event");
                    }
                    return Err(HubError::RateLimitExceeded(format!("tool {} rate limit exceeded", config.id)));
                }
                RateLimitDecision::Allowed => {}
            }
        }

        let error_path = config.response.as_ref().and_then(|r| r.error_path.as_deref());
        let result = self.dispatch(&config.api, &config.effective_domain_whitelist(), &data, error_path).await;

        let (response_value, success, error_message) = match &result {
            Ok(v) => (Some(v.clone()), true, None),
            Err(e) => (None, false, Some(e.to_string())),
        };
        ToolCallRecord::new(
            config.id.clone(),
            client_id.map(str::to_string),
            chrono::Utc::now(),
            &data,
            response_value.as_ref(),
            started.elapsed().as_millis() as u64,
            success,
            error_message,
            &[],
        )
        .log();

        let raw = result?;
        let transform = config.response.as_ref().and_then(|r| r.transform.as_deref());
        let shaped = response::shape_response(&raw, transform);
        Ok(ToolResult::json(shaped))
    }

    async fn dispatch(&self, spec: &ApiSpec, whitelist: &[String], data: &Value, error_path: Option<&str>) -> Result<Value, HubError> {
        let url_rendered = template::render(&spec.url, data);
        if !url_rendered.is_fully_resolved() {
            return Err(HubError::UnresolvedTemplateVariable(url_rendered.missing_data.join(", ")));
        }

        let parsed = url::Url::parse(&url_rendered.text).map_err(|e| HubError::InvalidParams(format!("invalid url: {e}")))?;
        let host = parsed.host_str().unwrap_or_default();
        if !whitelist::is_whitelisted(host, whitelist) {
            return Err(HubError::AccessDenied(format!("host {host} is not in the domain whitelist")));
        }

        let (headers, missing_headers) = template::render_headers(&spec.headers, data);
        if !missing_headers.is_empty() {
            return Err(HubError::UnresolvedTemplateVariable(missing_headers.join(", ")));
        }

        let (query, missing_query) = template::render_headers(&spec.query, data);
        if !missing_query.is_empty() {
            return Err(HubError::UnresolvedTemplateVariable(missing_query.join(", ")));
        }

        let body = match &spec.body {
            Some(b) => {
                let (rendered, missing) = template::render_body(b, data);
                if !missing.is_empty() {
                    return Err(HubError::UnresolvedTemplateVariable(missing.join(", ")));
                }
                Some(rendered)
            }
            None => None,
        };

        let method = match spec.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut request = self
            .client
            .request(method, parsed)
            .timeout(Duration::from_millis(spec.timeout_ms))
            .query(&query);
        let has_content_type = headers.keys().any(|k| k.eq_ignore_ascii_case("content-type"));
        for (k, v) in &headers {
            request = request.header(k, v);
        }
        if let Some(body) = &body {
            request = match body {
                // A raw template string isn't re-encoded as JSON; its own
                // configured Content-Type (if any) passes through untouched.
                Value::String(s) => {
                    if has_content_type {
                        request.body(s.clone())
                    } else {
                        request.header(reqwest::header::CONTENT_TYPE, "text/plain").body(s.clone())
                    }
                }
                _ => request.json(body),
            };
        }

        let response = request
            .send()
            .await
            .map_err(|e| HubError::ServerError(format!("upstream request failed: {e}")))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body_text = response.text().await.unwrap_or_default();

        let body_value: Value = match response::sniff_content_kind(content_type.as_deref(), &body_text) {
            response::ContentKind::Json => serde_json::from_str(&body_text).unwrap_or(Value::String(body_text.clone())),
            _ => Value::String(body_text.clone()),
        };

        if !(200..300).contains(&status) {
            let message = response::extract_error_message(&body_value, error_path).unwrap_or(body_text);
            return Err(response::status_to_hub_error(status, message));
        }

        Ok(body_value)
    }
}
