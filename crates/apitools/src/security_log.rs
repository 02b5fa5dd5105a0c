//! Redaction and structured security logging for API tool calls.
//!
//! Every parameter and response value that might carry a credential is
//! masked before it reaches a log line or the trace ring buffer, no matter
//! how deeply it is nested inside objects or arrays.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

const DEFAULT_SENSITIVE_KEYS: &[&str] = &["password", "token", "apikey", "authorization", "secret"];
const MASK: &str = "***REDACTED***";

/// Recursively redact values whose key (case-insensitively) matches a
/// sensitive-key pattern, anywhere in the structure including array
/// elements and nested objects.
pub fn redact(value: &Value, extra_keys: &[String]) -> Value {
    let sensitive: HashSet<String> = DEFAULT_SENSITIVE_KEYS
        .iter()
        .map(|s| s.to_string())
        .chain(extra_keys.iter().map(|s| s.to_ascii_lowercase()))
        .collect();
    redact_inner(value, &sensitive)
}

fn redact_inner(value: &Value, sensitive: &HashSet<String>) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let redacted = if sensitive.contains(&k.to_ascii_lowercase()) {
                        Value::String(MASK.to_string())
                    } else {
                        redact_inner(v, sensitive)
                    };
                    (k.clone(), redacted)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_inner(v, sensitive)).collect()),
        other => other.clone(),
    }
}

#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub tool_id: String,
    pub client_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub parameters: Value,
    pub response: Option<Value>,
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl ToolCallRecord {
    /// Build a record with parameters and response pre-redacted against the
    /// default sensitive-key set plus any tool-specific additions.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tool_id: impl Into<String>,
        client_id: Option<String>,
        timestamp: DateTime<Utc>,
        parameters: &Value,
        response: Option<&Value>,
        duration_ms: u64,
        success: bool,
        error: Option<String>,
        extra_sensitive_keys: &[String],
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            client_id,
            timestamp,
            parameters: redact(parameters, extra_sensitive_keys),
            response: response.map(|r| redact(r, extra_sensitive_keys)),
            duration_ms,
            success,
            error,
        }
    }

    pub fn log(&self) {
        if self.success {
            tracing::info!(
                tool_id = %self.tool_id,
                client_id = ?self.client_id,
                duration_ms = self.duration_ms,
                "api tool call succeeded"
            );
        } else {
            tracing::warn!(
                tool_id = %self.tool_id,
                client_id = ?self.client_id,
                duration_ms = self.duration_ms,
                error = ?self.error,
                "api tool call failed"
            );
        }
    }
}

/// Sliding-window alerting helpers over a sequence of recent call outcomes.
pub struct AlertThresholds {
    pub error_rate_threshold: f64,
    pub consecutive_auth_failures: u32,
    pub rate_limit_violations: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            error_rate_threshold: 0.5,
            consecutive_auth_failures: 3,
            rate_limit_violations: 5,
        }
    }
}

/// `true` when the fraction of failed calls in `outcomes` meets or exceeds
/// the configured threshold. An empty window never alerts.
pub fn error_rate_exceeds(outcomes: &[bool], thresholds: &AlertThresholds) -> bool {
    if outcomes.is_empty() {
        return false;
    }
    let failures = outcomes.iter().filter(|&&ok| !ok).count();
    (failures as f64 / outcomes.len() as f64) >= thresholds.error_rate_threshold
}

/// `true` when the tail of `outcomes` (most recent last) contains at least
/// `consecutive_auth_failures` consecutive `false` entries.
pub fn has_consecutive_auth_failures(outcomes: &[bool], thresholds: &AlertThresholds) -> bool {
    let needed = thresholds.consecutive_auth_failures as usize;
    if needed == 0 || outcomes.len() < needed {
        return false;
    }
    outcomes[outcomes.len() - needed..].iter().all(|&ok| !ok)
}
