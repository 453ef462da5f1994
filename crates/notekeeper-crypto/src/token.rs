//! Opaque session tokens.
//!
//! Tokens are `nk_s_` followed by 64 hex characters (32 random bytes). Only
//! the SHA-256 of a token is ever stored.

use notekeeper_core::defaults::SESSION_TOKEN_PREFIX;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate a new random session token.
pub fn generate_session_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    format!("{}{}", SESSION_TOKEN_PREFIX, hex::encode(bytes))
}

/// SHA-256 hex digest of a token, used as the storage key.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Cheap shape check before touching storage.
pub fn looks_like_session_token(token: &str) -> bool {
    token
        .strip_prefix(SESSION_TOKEN_PREFIX)
        .map(|rest| rest.len() == 64 && rest.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_format() {
        let token = generate_session_token();
        assert!(token.starts_with("nk_s_"));
        assert_eq!(token.len(), 5 + 64);
        assert!(looks_like_session_token(&token));
        assert_ne!(token, generate_session_token());
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let hash = hash_token("nk_s_abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("nk_s_abc"));
        assert_ne!(hash, hash_token("nk_s_abd"));
    }

    #[test]
    fn test_shape_check_rejects_other_strings() {
        assert!(!looks_like_session_token(""));
        assert!(!looks_like_session_token("nk_s_short"));
        assert!(!looks_like_session_token(&format!("mm_at_{}", "a".repeat(64))));
        assert!(!looks_like_session_token(&format!("nk_s_{}", "g".repeat(64))));
    }
}
