//! # notekeeper-crypto
//!
//! Signature and credential primitives for notekeeper.
//!
//! - **Widget verification**: HMAC-SHA256 over the sorted `key=value` payload,
//!   keyed with `SHA256(bot_token)`, compared in constant time
//! - **Login links**: HMAC-signed, five-minute URLs the bot hands to users
//! - **Passwords**: Argon2id, PHC string format
//! - **Session tokens**: random opaque tokens, stored only as SHA-256
//!
//! Verifiers answer `bool` and fail closed; they log the reason for a denial
//! instead of returning it.
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use notekeeper_crypto::{sign_payload, verify_signed_payload, widget_secret};
//!
//! let secret = widget_secret("123456:bot-token");
//! let mut payload = BTreeMap::new();
//! payload.insert("id".to_string(), "123".to_string());
//! payload.insert("auth_date".to_string(), "1700000000".to_string());
//! let hash = sign_payload(&payload, &secret);
//! payload.insert("hash".to_string(), hash);
//!
//! assert!(verify_signed_payload(&payload, &secret));
//! ```

pub mod error;
pub mod link;
pub mod password;
pub mod token;
pub mod widget;

pub use error::{CryptoError, CryptoResult};
pub use link::{login_link_url, sign_login_link, verify_login_link};
pub use password::{hash_password, verify_password};
pub use token::{generate_session_token, hash_token, looks_like_session_token};
pub use widget::{data_check_string, is_fresh, sign_payload, verify_signed_payload, widget_secret};
