//! Login-widget signature verification.
//!
//! The chat platform signs the login payload with HMAC-SHA256 over the
//! payload's canonical text: every field except `hash`, sorted by key, written
//! as `key=value` lines joined with `\n`. For the Telegram Login Widget the
//! HMAC key is `SHA256(bot_token)`.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Name of the field carrying the hex signature.
pub const SIGNATURE_FIELD: &str = "hash";

/// Widget HMAC key derived from the bot token.
pub fn widget_secret(bot_token: &str) -> [u8; 32] {
    Sha256::digest(bot_token.as_bytes()).into()
}

/// Canonical text the signature covers.
pub fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .filter(|(key, _)| key.as_str() != SIGNATURE_FIELD)
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn mac_over(fields: &BTreeMap<String, String>, secret: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(data_check_string(fields).as_bytes());
    Some(mac)
}

/// Lowercase hex signature for `fields` under `secret`.
///
/// Any existing `hash` entry is ignored.
pub fn sign_payload(fields: &BTreeMap<String, String>, secret: &[u8]) -> String {
    match mac_over(fields, secret) {
        Some(mac) => hex::encode(mac.finalize().into_bytes()),
        // HMAC accepts keys of any length
        None => String::new(),
    }
}

/// Check the `hash` field of a widget payload against `secret`.
///
/// Returns false, and logs why, when the signature is missing, is not hex,
/// has the wrong length, or does not match. The comparison is constant-time.
pub fn verify_signed_payload(fields: &BTreeMap<String, String>, secret: &[u8]) -> bool {
    let Some(supplied) = fields.get(SIGNATURE_FIELD) else {
        warn!(
            subsystem = "crypto",
            component = "widget",
            op = "verify",
            "Signed payload has no hash field"
        );
        return false;
    };

    let supplied = match hex::decode(supplied.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                subsystem = "crypto",
                component = "widget",
                op = "verify",
                error = %e,
                "Signed payload hash is not hex"
            );
            return false;
        }
    };

    let Some(mac) = mac_over(fields, secret) else {
        warn!(
            subsystem = "crypto",
            component = "widget",
            op = "verify",
            "Could not key HMAC"
        );
        return false;
    };

    match mac.verify_slice(&supplied) {
        Ok(()) => {
            debug!(
                subsystem = "crypto",
                component = "widget",
                op = "verify",
                field_count = fields.len(),
                "Signed payload verified"
            );
            true
        }
        Err(_) => {
            warn!(
                subsystem = "crypto",
                component = "widget",
                op = "verify",
                field_count = fields.len(),
                "Signed payload hash mismatch"
            );
            false
        }
    }
}

/// Whether a widget `auth_date` (unix seconds) is recent enough.
///
/// `max_age_secs == 0` disables the check. Malformed dates and dates more
/// than a minute in the future are rejected.
pub fn is_fresh(auth_date: &str, now_unix: i64, max_age_secs: u64) -> bool {
    if max_age_secs == 0 {
        return true;
    }
    let Ok(issued) = auth_date.trim().parse::<i64>() else {
        warn!(
            subsystem = "crypto",
            component = "widget",
            op = "freshness",
            "auth_date is not an integer"
        );
        return false;
    };
    let Some(age) = now_unix.checked_sub(issued) else {
        warn!(
            subsystem = "crypto",
            component = "widget",
            op = "freshness",
            "auth_date out of range"
        );
        return false;
    };
    let max_age = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
    if age < -60 || age > max_age {
        warn!(
            subsystem = "crypto",
            component = "widget",
            op = "freshness",
            age_secs = age,
            "auth_date outside accepted window"
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"S";

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn signed(pairs: &[(&str, &str)], secret: &[u8]) -> BTreeMap<String, String> {
        let mut payload = fields(pairs);
        let hash = sign_payload(&payload, secret);
        payload.insert("hash".to_string(), hash);
        payload
    }

    #[test]
    fn test_data_check_string_sorted_without_hash() {
        let payload = fields(&[
            ("username", "ann"),
            ("id", "123"),
            ("hash", "ff"),
            ("auth_date", "1700000000"),
        ]);
        assert_eq!(
            data_check_string(&payload),
            "auth_date=1700000000\nid=123\nusername=ann"
        );
    }

    #[test]
    fn test_signature_matches_manual_hmac() {
        let payload = fields(&[("id", "1"), ("auth_date", "2")]);
        let mut mac = HmacSha256::new_from_slice(SECRET).unwrap();
        mac.update(b"auth_date=2\nid=1");
        let expected = hex::encode(mac.finalize().into_bytes());
        assert_eq!(sign_payload(&payload, SECRET), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_ann_payload_verifies_and_mutation_fails() {
        let payload = signed(
            &[("id", "123"), ("first_name", "Ann"), ("auth_date", "1700000000")],
            SECRET,
        );
        assert!(verify_signed_payload(&payload, SECRET));

        let mut tampered = payload.clone();
        tampered.insert("first_name".to_string(), "Anna".to_string());
        assert!(!verify_signed_payload(&tampered, SECRET));
    }

    #[test]
    fn test_any_single_field_change_or_drop_fails() {
        let payload = signed(
            &[
                ("id", "987654321"),
                ("first_name", "Ann"),
                ("last_name", "Lee"),
                ("username", "annlee"),
                ("photo_url", "https://t.me/i/userpic/320/ann.jpg"),
                ("auth_date", "1700000000"),
            ],
            SECRET,
        );
        assert!(verify_signed_payload(&payload, SECRET));

        for key in payload.keys().filter(|k| k.as_str() != "hash") {
            let mut changed = payload.clone();
            changed.insert(key.clone(), format!("{}x", payload[key]));
            assert!(!verify_signed_payload(&changed, SECRET), "changed {key}");

            let mut dropped = payload.clone();
            dropped.remove(key);
            assert!(!verify_signed_payload(&dropped, SECRET), "dropped {key}");
        }

        let mut added = payload.clone();
        added.insert("extra".to_string(), "1".to_string());
        assert!(!verify_signed_payload(&added, SECRET));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = signed(&[("id", "1"), ("auth_date", "2")], SECRET);
        assert!(!verify_signed_payload(&payload, b"other"));
    }

    #[test]
    fn test_malformed_hash_fails_closed() {
        let mut payload = fields(&[("id", "1")]);
        assert!(!verify_signed_payload(&payload, SECRET));

        payload.insert("hash".to_string(), "not-hex".to_string());
        assert!(!verify_signed_payload(&payload, SECRET));

        payload.insert("hash".to_string(), "abcd".to_string());
        assert!(!verify_signed_payload(&payload, SECRET));

        payload.insert("hash".to_string(), String::new());
        assert!(!verify_signed_payload(&payload, SECRET));
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let mut payload = signed(&[("id", "5")], SECRET);
        let upper = payload["hash"].to_uppercase();
        payload.insert("hash".to_string(), upper);
        assert!(verify_signed_payload(&payload, SECRET));
    }

    #[test]
    fn test_widget_secret_is_sha256_of_token() {
        let secret = widget_secret("123:abc");
        assert_eq!(secret.as_slice(), Sha256::digest(b"123:abc").as_slice());

        let payload = signed(&[("id", "42")], &secret);
        assert!(verify_signed_payload(&payload, &secret));
        assert!(!verify_signed_payload(&payload, b"123:abc"));
    }

    #[test]
    fn test_freshness_window() {
        let now = 1_700_086_400;
        assert!(is_fresh("1700000000", now, 86_400));
        assert!(!is_fresh("1699999999", now, 86_400));
        assert!(!is_fresh(&(now + 3600).to_string(), now, 86_400));
        assert!(!is_fresh("yesterday", now, 86_400));
        assert!(is_fresh("0", now, 0));
    }

    #[test]
    fn test_extreme_auth_dates_rejected() {
        let now = 1_760_000_000;
        assert!(!is_fresh(&i64::MIN.to_string(), now, 86_400));
        assert!(!is_fresh(&i64::MAX.to_string(), now, 86_400));
        assert!(!is_fresh("1700000000", i64::MIN, 86_400));
        assert!(!is_fresh(&i64::MIN.to_string(), now, u64::MAX));
        assert!(is_fresh("1700000000", now, u64::MAX));
    }
}
