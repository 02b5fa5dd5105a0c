//! Access-key hashing and constant-time verification for group gating.
//!
//! Mirrors the bearer-token pattern used for the front-end's own API
//! token: hash with SHA-256, compare in constant time so a group key's
//! length and prefix never leak through timing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hash a plaintext access key to the hex digest stored as `keyHash`.
pub fn hash_key(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Verify `provided` against a stored hex-encoded `expected_hash` in
/// constant time.
pub fn verify_key(provided: &str, expected_hash: &str) -> bool {
    let Ok(expected) = hex::decode(expected_hash) else {
        return false;
    };
    let provided_hash = Sha256::digest(provided.as_bytes());
    bool::from(provided_hash.as_slice().ct_eq(&expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_key_verifies() {
        let hash = hash_key("super-secret");
        assert!(verify_key("super-secret", &hash));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let hash = hash_key("super-secret");
        assert!(!verify_key("wrong-key", &hash));
    }

    #[test]
    fn malformed_stored_hash_never_panics() {
        assert!(!verify_key("anything", "not-hex"));
    }
}
