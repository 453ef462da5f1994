//! One-click web login links sent by the bot.
//!
//! A link carries `telegram_id`, `timestamp`, and
//! `token = HMAC-SHA256(secret, "<telegram_id>:<timestamp>")`. Links expire
//! after `LOGIN_LINK_TTL_SECS`.

use hmac::{Hmac, Mac};
use notekeeper_core::defaults::LOGIN_LINK_TTL_SECS;
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Tolerated clock skew for timestamps slightly ahead of the server.
const FUTURE_SKEW_SECS: i64 = 30;

fn link_mac(secret: &[u8], telegram_id: i64, timestamp: i64) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(format!("{}:{}", telegram_id, timestamp).as_bytes());
    Some(mac)
}

/// Hex token for a login link.
pub fn sign_login_link(secret: &[u8], telegram_id: i64, timestamp: i64) -> String {
    link_mac(secret, telegram_id, timestamp)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Full login URL under `base_url` for `telegram_id`, issued at `now_unix`.
pub fn login_link_url(base_url: &str, secret: &[u8], telegram_id: i64, now_unix: i64) -> String {
    let token = sign_login_link(secret, telegram_id, now_unix);
    format!(
        "{}/auth/telegram/link?telegram_id={}&timestamp={}&token={}",
        base_url.trim_end_matches('/'),
        telegram_id,
        now_unix,
        urlencoding::encode(&token)
    )
}

/// Verify a login link's token and age. Fails closed.
pub fn verify_login_link(
    secret: &[u8],
    telegram_id: i64,
    timestamp: i64,
    token: &str,
    now_unix: i64,
) -> bool {
    let Some(age) = now_unix.checked_sub(timestamp) else {
        warn!(
            subsystem = "crypto",
            component = "link",
            op = "verify",
            telegram_id,
            "Login link timestamp out of range"
        );
        return false;
    };
    if age > LOGIN_LINK_TTL_SECS || age < -FUTURE_SKEW_SECS {
        warn!(
            subsystem = "crypto",
            component = "link",
            op = "verify",
            telegram_id,
            age_secs = age,
            "Login link expired or from the future"
        );
        return false;
    }

    let Ok(supplied) = hex::decode(token.trim()) else {
        warn!(
            subsystem = "crypto",
            component = "link",
            op = "verify",
            telegram_id,
            "Login link token is not hex"
        );
        return false;
    };

    let valid = link_mac(secret, telegram_id, timestamp)
        .map(|mac| mac.verify_slice(&supplied).is_ok())
        .unwrap_or(false);
    if !valid {
        warn!(
            subsystem = "crypto",
            component = "link",
            op = "verify",
            telegram_id,
            "Login link token mismatch"
        );
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"signing-secret";
    const NOW: i64 = 1_760_000_000;

    #[test]
    fn test_fresh_link_verifies() {
        let token = sign_login_link(SECRET, 42, NOW);
        assert!(verify_login_link(SECRET, 42, NOW, &token, NOW));
        assert!(verify_login_link(SECRET, 42, NOW, &token, NOW + 300));
    }

    #[test]
    fn test_expired_link_rejected() {
        let token = sign_login_link(SECRET, 42, NOW);
        assert!(!verify_login_link(SECRET, 42, NOW, &token, NOW + 301));
    }

    #[test]
    fn test_future_link_rejected() {
        let ts = NOW + 3600;
        let token = sign_login_link(SECRET, 42, ts);
        assert!(!verify_login_link(SECRET, 42, ts, &token, NOW));
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        assert!(!verify_login_link(SECRET, 1, i64::MIN, "00", NOW));
        assert!(!verify_login_link(SECRET, 1, i64::MAX, "00", NOW));
        let token = sign_login_link(SECRET, 1, i64::MIN);
        assert!(!verify_login_link(SECRET, 1, i64::MIN, &token, NOW));
        assert!(!verify_login_link(SECRET, 1, NOW, "00", i64::MIN));
    }

    #[test]
    fn test_tampered_fields_rejected() {
        let token = sign_login_link(SECRET, 42, NOW);
        assert!(!verify_login_link(SECRET, 43, NOW, &token, NOW));
        assert!(!verify_login_link(SECRET, 42, NOW - 1, &token, NOW));
        assert!(!verify_login_link(b"other", 42, NOW, &token, NOW));
        assert!(!verify_login_link(SECRET, 42, NOW, "zz", NOW));
        assert!(!verify_login_link(SECRET, 42, NOW, "", NOW));
    }

    #[test]
    fn test_login_link_url_shape() {
        let url = login_link_url("https://notes.example.com/", SECRET, 42, NOW);
        let token = sign_login_link(SECRET, 42, NOW);
        assert_eq!(
            url,
            format!(
                "https://notes.example.com/auth/telegram/link?telegram_id=42&timestamp={}&token={}",
                NOW, token
            )
        );
    }
}
