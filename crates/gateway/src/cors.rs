//! Builds the CORS layer from `ListenConfig.cors.allowed_origins`.
//!
//! Three origin shapes are honoured: an exact origin string, a
//! `scheme://host:*` wildcard-port pattern (the common case for local
//! development against a browser on a random port), and the literal `"*"`
//! permissive wildcard.

use axum::http::{HeaderValue, Method};
use mcphub_domain::config::CorsConfig;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    if cors.allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured permissive: allowed_origins contains \"*\"");
        return layer.allow_origin(tower_http::cors::Any);
    }

    let patterns: Vec<String> = cors.allowed_origins.clone();
    layer.allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| origin_matches(origin, &patterns)))
}

fn origin_matches(origin: &HeaderValue, patterns: &[String]) -> bool {
    let Ok(origin) = origin.to_str() else { return false };
    patterns.iter().any(|pattern| match pattern.strip_suffix(":*") {
        Some(prefix) => origin.starts_with(prefix) && origin[prefix.len()..].starts_with(':'),
        None => origin == pattern,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_origin_matches() {
        let patterns = vec!["https://app.example.com".to_string()];
        assert!(origin_matches(&HeaderValue::from_static("https://app.example.com"), &patterns));
        assert!(!origin_matches(&HeaderValue::from_static("https://evil.example.com"), &patterns));
    }

    #[test]
    fn wildcard_port_matches_any_port() {
        let patterns = vec!["http://localhost:*".to_string()];
        assert!(origin_matches(&HeaderValue::from_static("http://localhost:5173"), &patterns));
        assert!(origin_matches(&HeaderValue::from_static("http://localhost:3000"), &patterns));
        assert!(!origin_matches(&HeaderValue::from_static("http://localhost.evil.com:3000"), &patterns));
    }

    #[test]
    fn no_pattern_matches_rejects() {
        let patterns = vec!["http://localhost:*".to_string()];
        assert!(!origin_matches(&HeaderValue::from_static("https://example.com"), &patterns));
    }
}
