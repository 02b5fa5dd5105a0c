//! Per-group key gating. Groups with `validation.enabled` require the
//! caller to present the plaintext key that hashes to the stored
//! `keyHash`; the comparison itself lives in [`mcphub_groups`] and is
//! constant-time.

use axum::http::HeaderMap;

use mcphub_domain::HubError;

use crate::state::HubState;

const BEARER_PREFIX: &str = "Bearer ";
const GROUP_KEY_HEADER: &str = "x-group-key";

/// Pull a candidate group key out of the request: `Authorization: Bearer
/// <key>` takes precedence over the `X-Group-Key` header, mirroring how
/// the teacher's own bearer-token middleware prioritises the standard
/// header before a bespoke one.
pub fn extract_group_key(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix(BEARER_PREFIX) {
            return Some(token.to_string());
        }
    }
    headers.get(GROUP_KEY_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Enforce group-key validation for a per-group endpoint. A no-op for
/// groups that don't require a key.
pub async fn require_group_key(state: &HubState, group_id: &str, headers: &HeaderMap) -> Result<(), HubError> {
    let provided = extract_group_key(headers);
    let ok = state.facade.group_manager.verify_key(group_id, provided.as_deref())?;
    if ok {
        Ok(())
    } else {
        Err(HubError::AuthFailed(format!("invalid or missing key for group \"{group_id}\"")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token_over_custom_header() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        headers.insert(GROUP_KEY_HEADER, HeaderValue::from_static("other"));
        assert_eq!(extract_group_key(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn falls_back_to_custom_header() {
        let mut headers = HeaderMap::new();
        headers.insert(GROUP_KEY_HEADER, HeaderValue::from_static("xyz"));
        assert_eq!(extract_group_key(&headers), Some("xyz".to_string()));
    }

    #[test]
    fn no_key_present_is_none() {
        assert_eq!(extract_group_key(&HeaderMap::new()), None);
    }
}
