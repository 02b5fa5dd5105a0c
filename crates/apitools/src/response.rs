//! Response shaping: content-type sniffing, JSONata transform with a raw
//! fallback, error-message extraction, and HTTP status to `McpError` code
//! mapping.

use mcphub_domain::HubError;
use serde_json::Value;

use crate::jsonata_shim;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Xml,
    Csv,
    KeyValue,
    PlainText,
}

/// Sniff the response body's shape from its `Content-Type` header (when
/// present and recognized) or, failing that, the body's own leading bytes.
pub fn sniff_content_kind(content_type: Option<&str>, body: &str) -> ContentKind {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if ct.contains("json") {
            return ContentKind::Json;
        }
        if ct.contains("xml") {
            return ContentKind::Xml;
        }
        if ct.contains("csv") {
            return ContentKind::Csv;
        }
    }

    let trimmed = body.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return ContentKind::Json;
    }
    if trimmed.starts_with('<') {
        return ContentKind::Xml;
    }
    if trimmed.lines().take(2).all(|l| l.contains(',')) && trimmed.contains(',') {
        return ContentKind::Csv;
    }
    if trimmed.lines().next().is_some_and(|l| l.contains(':') && !l.contains('<')) {
        return ContentKind::KeyValue;
    }
    ContentKind::PlainText
}

/// Shape a raw JSON response body through an optional JSONata transform.
/// On transform failure, falls back to the raw body with `_fallback: true`
/// spliced in so the caller can see shaping was skipped, rather than
/// surfacing a hard error for what is ultimately a formatting nicety.
pub fn shape_response(raw: &Value, transform: Option<&str>) -> Value {
    let Some(expr) = transform else {
        return raw.clone();
    };
    match jsonata_shim::evaluate(expr, raw) {
        Ok(shaped) => shaped,
        Err(err) => {
            tracing::warn!(error = %err, expression = %expr, "jsonata transform failed, falling back to raw response");
            let mut fallback = raw.clone();
            if let Value::Object(ref mut map) = fallback {
                map.insert("_fallback".to_string(), Value::Bool(true));
            }
            fallback
        }
    }
}

const ERROR_FIELD_CANDIDATES: &[&str] = &["error.message", "error", "message", "msg", "detail", "description"];

/// Extract a human-readable error message from a failed API response body.
/// Tries `error_path` (a dotted path, mirroring template lookup) first, then
/// falls back to a fixed list of common field names.
pub fn extract_error_message(body: &Value, error_path: Option<&str>) -> Option<String> {
    if let Some(path) = error_path {
        if let Some(v) = lookup_dotted(body, path) {
            return value_as_message(v);
        }
    }
    for candidate in ERROR_FIELD_CANDIDATES {
        if let Some(v) = lookup_dotted(body, candidate) {
            if let Some(msg) = value_as_message(v) {
                return Some(msg);
            }
        }
    }
    None
}

fn lookup_dotted<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn value_as_message(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Map an upstream HTTP status code and extracted message to the hub's
/// error taxonomy.
pub fn status_to_hub_error(status: u16, message: String) -> HubError {
    match status {
        400 => HubError::InvalidParams(message),
        401 => HubError::AuthFailed(message),
        403 => HubError::Forbidden(message),
        404 => HubError::NotFound(message),
        429 => HubError::RateLimitExceeded(message),
        _ => HubError::ServerError(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sniffs_json_from_content_type() {
        assert_eq!(sniff_content_kind(Some("application/json; charset=utf-8"), "{}"), ContentKind::Json);
    }

    #[test]
    fn sniffs_json_from_body_when_no_content_type() {
        assert_eq!(sniff_content_kind(None, "  [1, 2, 3]"), ContentKind::Json);
    }

    #[test]
    fn sniffs_xml_from_body() {
        assert_eq!(sniff_content_kind(None, "<root><a>1</a></root>"), ContentKind::Xml);
    }

    #[test]
    fn sniffs_plain_text_as_fallback() {
        assert_eq!(sniff_content_kind(None, "just some words"), ContentKind::PlainText);
    }

    #[test]
    fn shape_response_without_transform_passes_through() {
        let raw = json!({ "a": 1 });
        assert_eq!(shape_response(&raw, None), raw);
    }

    #[test]
    fn shape_response_falls_back_on_bad_expression() {
        let raw = json!({ "a": 1 });
        let shaped = shape_response(&raw, Some("{{{invalid"));
        assert_eq!(shaped["_fallback"], true);
        assert_eq!(shaped["a"], 1);
    }

    #[test]
    fn extract_error_message_uses_explicit_path() {
        let body = json!({ "err": { "text": "boom" } });
        assert_eq!(extract_error_message(&body, Some("err.text")), Some("boom".to_string()));
    }

    #[test]
    fn extract_error_message_falls_back_to_common_fields() {
        let body = json!({ "message": "nope" });
        assert_eq!(extract_error_message(&body, None), Some("nope".to_string()));
    }

    #[test]
    fn extract_error_message_returns_none_when_nothing_matches() {
        let body = json!({ "unrelated": 1 });
        assert_eq!(extract_error_message(&body, None), None);
    }

    #[test]
    fn status_code_mapping_matches_table() {
        assert_eq!(status_to_hub_error(400, "x".into()).code(), "InvalidParams");
        assert_eq!(status_to_hub_error(401, "x".into()).code(), "AuthFailed");
        assert_eq!(status_to_hub_error(403, "x".into()).code(), "Forbidden");
        assert_eq!(status_to_hub_error(404, "x".into()).code(), "NotFound");
        assert_eq!(status_to_hub_error(429, "x".into()).code(), "RateLimitExceeded");
        assert_eq!(status_to_hub_error(503, "x".into()).code(), "ServerError");
    }
}
