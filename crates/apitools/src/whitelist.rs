//! URL host whitelist matching, including `*.example.com` wildcards.

/// Returns `true` if `host` matches `pattern`. A pattern starting with
/// `*.` matches any single-label (or deeper) subdomain of the rest, but
/// not the bare root domain itself — `*.example.com` matches
/// `api.example.com` but not `example.com`.
pub fn host_matches(host: &str, pattern: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();
    match pattern.strip_prefix("*.") {
        Some(suffix) => host.ends_with(suffix) && host.len() > suffix.len() && host.as_bytes()[host.len() - suffix.len() - 1] == b'.',
        None => host == pattern,
    }
}

pub fn is_whitelisted(host: &str, whitelist: &[String]) -> bool {
    whitelist.iter().any(|p| host_matches(host, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(host_matches("api.example.com", "api.example.com"));
        assert!(!host_matches("other.example.com", "api.example.com"));
    }

    #[test]
    fn wildcard_matches_subdomain_not_root() {
        assert!(host_matches("api.example.com", "*.example.com"));
        assert!(!host_matches("example.com", "*.example.com"));
    }

    #[test]
    fn wildcard_does_not_match_unrelated_suffix() {
        assert!(!host_matches("evilexample.com", "*.example.com"));
    }

    #[test]
    fn is_whitelisted_checks_all_patterns() {
        let wl = vec!["api.example.com".to_string(), "*.trusted.io".to_string()];
        assert!(is_whitelisted("sub.trusted.io", &wl));
        assert!(!is_whitelisted("evil.io", &wl));
    }
}
