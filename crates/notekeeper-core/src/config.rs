//! Environment configuration shared by the web server and the bot.
//!
//! Values come from process environment variables (load `.env` with
//! `dotenvy::dotenv()` first). `Settings::from_lookup` takes any key lookup so
//! tests never have to mutate the process environment.

use chrono::{Duration, FixedOffset};

use crate::defaults;
use crate::error::{Error, Result};
use crate::temporal::offset_from_hours;

/// Telegram bot and login-widget settings.
#[derive(Debug, Clone)]
pub struct TelegramSettings {
    /// Bot API token; also the root of the login-widget HMAC key.
    pub bot_token: String,
    /// Bot username (without `@`), embedded in the login widget.
    pub bot_username: String,
    /// Bot API base URL.
    pub api_url: String,
    /// Maximum age of a widget `auth_date`; 0 disables the check.
    pub auth_max_age_secs: u64,
}

/// Rate limiting for the authentication endpoints.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub requests: u64,
    pub period_secs: u64,
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Public base URL of the web application (no trailing slash).
    pub webapp_url: String,
    /// Shared secret used to sign bot login links.
    pub secret_key: String,
    pub telegram: TelegramSettings,
    pub session_ttl: Duration,
    pub session_cookie_secure: bool,
    /// Offset used to render and parse local dates.
    pub display_offset: FixedOffset,
    pub rate_limit: RateLimitSettings,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{} is not set", key)))
        };

        let bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let bot_username = required("TELEGRAM_BOT_USERNAME")?
            .trim_start_matches('@')
            .to_string();
        let secret_key = required("SECRET_KEY")?;

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => {
                let user = get("POSTGRES_USER").unwrap_or_else(|| defaults::POSTGRES_USER.into());
                let password = get("POSTGRES_PASSWORD").unwrap_or_default();
                let host = get("POSTGRES_HOST").unwrap_or_else(|| defaults::POSTGRES_HOST.into());
                let port = get("POSTGRES_PORT").unwrap_or_else(|| defaults::POSTGRES_PORT.into());
                let db = get("POSTGRES_DB").unwrap_or_else(|| defaults::POSTGRES_DB.into());
                format!("postgres://{user}:{password}@{host}:{port}/{db}")
            }
        };

        let port = parse_or(get("PORT"), defaults::PORT, "PORT")?;
        let session_ttl_hours =
            parse_or(get("SESSION_TTL_HOURS"), defaults::SESSION_TTL_HOURS, "SESSION_TTL_HOURS")?;
        if session_ttl_hours <= 0 {
            return Err(Error::Config("SESSION_TTL_HOURS must be positive".to_string()));
        }
        let offset_hours = parse_or(
            get("DISPLAY_UTC_OFFSET_HOURS"),
            defaults::DISPLAY_UTC_OFFSET_HOURS,
            "DISPLAY_UTC_OFFSET_HOURS",
        )?;

        Ok(Self {
            database_url,
            host: get("HOST").unwrap_or_else(|| defaults::HOST.to_string()),
            port,
            webapp_url: get("WEBAPP_URL")
                .unwrap_or_else(|| defaults::WEBAPP_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            secret_key,
            telegram: TelegramSettings {
                bot_token,
                bot_username,
                api_url: get("TELEGRAM_API_URL")
                    .unwrap_or_else(|| defaults::TELEGRAM_API_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                auth_max_age_secs: parse_or(
                    get("TELEGRAM_AUTH_MAX_AGE_SECS"),
                    defaults::TELEGRAM_AUTH_MAX_AGE_SECS,
                    "TELEGRAM_AUTH_MAX_AGE_SECS",
                )?,
            },
            session_ttl: Duration::hours(session_ttl_hours),
            session_cookie_secure: get("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            display_offset: offset_from_hours(offset_hours),
            rate_limit: RateLimitSettings {
                enabled: get("RATE_LIMIT_ENABLED")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(true),
                requests: parse_or(
                    get("RATE_LIMIT_REQUESTS"),
                    defaults::RATE_LIMIT_REQUESTS,
                    "RATE_LIMIT_REQUESTS",
                )?,
                period_secs: parse_or(
                    get("RATE_LIMIT_PERIOD_SECS"),
                    defaults::RATE_LIMIT_PERIOD_SECS,
                    "RATE_LIMIT_PERIOD_SECS",
                )?,
            },
        })
    }

    /// Socket address string the web server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T, key: &str) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("TELEGRAM_BOT_USERNAME", "@notes_bot"),
        ("SECRET_KEY", "s3cret"),
    ];

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(settings.telegram.bot_username, "notes_bot");
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.bind_addr(), "0.0.0.0:8000");
        assert_eq!(
            settings.database_url,
            "postgres://user:@db:5432/notes_db"
        );
        assert_eq!(settings.telegram.api_url, "https://api.telegram.org");
        assert_eq!(settings.session_ttl, Duration::hours(24 * 14));
        assert_eq!(settings.display_offset.local_minus_utc(), 3 * 3600);
        assert!(!settings.session_cookie_secure);
        assert!(settings.rate_limit.enabled);
    }

    #[test]
    fn test_database_url_from_parts() {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(&[
            ("POSTGRES_USER", "notes"),
            ("POSTGRES_PASSWORD", "pw"),
            ("POSTGRES_HOST", "localhost"),
            ("POSTGRES_DB", "notes_test"),
        ]);
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            settings.database_url,
            "postgres://notes:pw@localhost:5432/notes_test"
        );
    }

    #[test]
    fn test_database_url_wins_over_parts() {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(&[
            ("DATABASE_URL", "postgres://x@y/z"),
            ("POSTGRES_HOST", "ignored"),
        ]);
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.database_url, "postgres://x@y/z");
    }

    #[test]
    fn test_missing_bot_token_is_config_error() {
        let err = Settings::from_lookup(lookup(&BASE[1..])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            Settings::from_lookup(lookup(&pairs)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_webapp_url_trailing_slash_trimmed() {
        let mut pairs = BASE.to_vec();
        pairs.push(("WEBAPP_URL", "https://notes.example.com/"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.webapp_url, "https://notes.example.com");
    }
}
