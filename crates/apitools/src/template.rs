//! `{{data.a.b.c}}` / `{{env.NAME}}` template interpolation.
//!
//! Used to render the URL, headers, query params, and body template of an
//! `ApiToolConfig` against the validated call arguments and the process
//! environment.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(data|env)\.([A-Za-z0-9_.]+)\s*\}\}").unwrap());

/// Resolves `{{env.NAME}}` against the process environment before template
/// rendering. Missing variables leave the placeholder untouched and the
/// caller should log a warning (done by [`resolve_env_placeholders`]'s
/// return value: the list of names that were missing).
pub fn resolve_env_placeholders(input: &str) -> (String, Vec<String>) {
    let mut missing = Vec::new();
    let rendered = PLACEHOLDER
        .replace_all(input, |caps: &regex::Captures| {
            if &caps[1] != "env" {
                return caps[0].to_string();
            }
            let name = &caps[2];
            match std::env::var(name) {
                Ok(v) => v,
                Err(_) => {
                    missing.push(name.to_string());
                    caps[0].to_string()
                }
            }
        })
        .into_owned();
    (rendered, missing)
}

/// Render a single template string against the validated `data` map.
/// Returns the rendered string and the list of unresolved `data.*` paths
/// (the caller surfaces these as `UnresolvedTemplateVariable`).
pub fn render_data(input: &str, data: &Value) -> (String, Vec<String>) {
    let mut unresolved = Vec::new();
    let rendered = PLACEHOLDER
        .replace_all(input, |caps: &regex::Captures| {
            if &caps[1] != "data" {
                return caps[0].to_string();
            }
            let path = &caps[2];
            match lookup_path(data, path) {
                Some(v) => value_to_template_string(v),
                None => {
                    unresolved.push(format!("data.{path}"));
                    caps[0].to_string()
                }
            }
        })
        .into_owned();
    (rendered, unresolved)
}

/// Render env then data placeholders, in that order, collecting every
/// unresolved reference (env misses are reported but not fatal; data
/// misses are fatal per the request-rendering contract).
pub fn render(input: &str, data: &Value) -> RenderedTemplate {
    let (after_env, missing_env) = resolve_env_placeholders(input);
    let (after_data, missing_data) = render_data(&after_env, data);
    RenderedTemplate {
        text: after_data,
        missing_env,
        missing_data,
    }
}

pub struct RenderedTemplate {
    pub text: String,
    pub missing_env: Vec<String>,
    pub missing_data: Vec<String>,
}

impl RenderedTemplate {
    pub fn is_fully_resolved(&self) -> bool {
        self.missing_data.is_empty()
    }
}

fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn value_to_template_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render every string-valued header.
pub fn render_headers(headers: &HashMap<String, String>, data: &Value) -> (HashMap<String, String>, Vec<String>) {
    let mut out = HashMap::with_capacity(headers.len());
    let mut missing = Vec::new();
    for (k, v) in headers {
        let rendered = render(v, data);
        missing.extend(rendered.missing_data);
        out.insert(k.clone(), rendered.text);
    }
    (out, missing)
}

/// Render a body template: each string leaf is interpolated, other value
/// kinds pass through unchanged.
pub fn render_body(body: &Value, data: &Value) -> (Value, Vec<String>) {
    let mut missing = Vec::new();
    let rendered = render_value(body, data, &mut missing);
    (rendered, missing)
}

fn render_value(value: &Value, data: &Value, missing: &mut Vec<String>) -> Value {
    match value {
        Value::String(s) => {
            let rendered = render(s, data);
            missing.extend(rendered.missing_data);
            Value::String(rendered.text)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, data, missing)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, data, missing)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_nested_data_path() {
        let data = json!({ "a": { "b": { "c": "value" } } });
        let (text, unresolved) = render_data("prefix/{{data.a.b.c}}/suffix", &data);
        assert_eq!(text, "prefix/value/suffix");
        assert!(unresolved.is_empty());
    }

    #[test]
    fn unresolved_data_path_leaves_placeholder_and_is_reported() {
        let data = json!({});
        let (text, unresolved) = render_data("{{data.missing}}", &data);
        assert_eq!(text, "{{data.missing}}");
        assert_eq!(unresolved, vec!["data.missing".to_string()]);
    }

    #[test]
    fn resolves_env_variable() {
        std::env::set_var("MCPHUB_TEST_TEMPLATE_VAR", "secret");
        let (text, missing) = resolve_env_placeholders("token={{env.MCPHUB_TEST_TEMPLATE_VAR}}");
        assert_eq!(text, "token=secret");
        assert!(missing.is_empty());
        std::env::remove_var("MCPHUB_TEST_TEMPLATE_VAR");
    }

    #[test]
    fn missing_env_variable_leaves_placeholder() {
        let (text, missing) = resolve_env_placeholders("{{env.MCPHUB_DEFINITELY_UNSET}}");
        assert_eq!(text, "{{env.MCPHUB_DEFINITELY_UNSET}}");
        assert_eq!(missing, vec!["MCPHUB_DEFINITELY_UNSET".to_string()]);
    }

    #[test]
    fn render_body_walks_nested_object() {
        let data = json!({ "city": "Paris" });
        let body = json!({ "query": { "location": "{{data.city}}" }, "limit": 5 });
        let (rendered, missing) = render_body(&body, &data);
        assert_eq!(rendered["query"]["location"], "Paris");
        assert_eq!(rendered["limit"], 5);
        assert!(missing.is_empty());
    }
}
