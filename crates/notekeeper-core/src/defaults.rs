//! Centralized default constants for notekeeper.
//!
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host for the web server.
pub const HOST: &str = "0.0.0.0";

/// Default bind port for the web server.
pub const PORT: u16 = 8000;

/// Default public base URL used in links sent by the bot.
pub const WEBAPP_URL: &str = "http://localhost:8000";

// =============================================================================
// DATABASE
// =============================================================================

/// Default database name when composing the URL from POSTGRES_* parts.
pub const POSTGRES_DB: &str = "notes_db";

/// Default database user.
pub const POSTGRES_USER: &str = "user";

/// Default database host.
pub const POSTGRES_HOST: &str = "db";

/// Default database port.
pub const POSTGRES_PORT: &str = "5432";

// =============================================================================
// AUTHENTICATION
// =============================================================================

/// Session lifetime in hours (two weeks).
pub const SESSION_TTL_HOURS: i64 = 24 * 14;

/// Name of the browser session cookie.
pub const SESSION_COOKIE_NAME: &str = "notekeeper_session";

/// Prefix for opaque session tokens.
pub const SESSION_TOKEN_PREFIX: &str = "nk_s_";

/// Maximum accepted age of a login-widget `auth_date` (one day).
pub const TELEGRAM_AUTH_MAX_AGE_SECS: u64 = 86_400;

/// Lifetime of a bot-issued web login link.
pub const LOGIN_LINK_TTL_SECS: i64 = 300;

/// Minimum password length for web registration.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Prefix of the placeholder username given to chat-created accounts.
pub const EXTERNAL_USERNAME_PREFIX: &str = "tg_";

// =============================================================================
// TELEGRAM
// =============================================================================

/// Telegram Bot API base URL.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Long-poll timeout passed to getUpdates.
pub const TELEGRAM_POLL_TIMEOUT_SECS: u64 = 30;

/// Idle time before a half-finished /new conversation is discarded.
pub const CONVERSATION_TTL_SECS: i64 = 600;

// =============================================================================
// LISTING
// =============================================================================

/// Notes shown by the bot's /recent command.
pub const RECENT_NOTES_LIMIT: i64 = 5;

/// Notes returned by the bot's /search command.
pub const SEARCH_RESULTS_LIMIT: i64 = 10;

/// Default page size for REST list endpoints.
pub const PAGE_LIMIT: i64 = 50;

/// Upper bound for a requested page size.
pub const PAGE_LIMIT_MAX: i64 = 500;

// =============================================================================
// DISPLAY
// =============================================================================

/// UTC offset used to render timestamps (Europe/Moscow).
pub const DISPLAY_UTC_OFFSET_HOURS: i32 = 3;

// =============================================================================
// RATE LIMITING
// =============================================================================

/// Requests allowed per period on the authentication endpoints.
pub const RATE_LIMIT_REQUESTS: u64 = 30;

/// Rate limit period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

// =============================================================================
// VALIDATION
// =============================================================================

/// Maximum note title length.
pub const TITLE_MAX_LENGTH: usize = 200;

/// Maximum category or tag name length.
pub const LABEL_MAX_LENGTH: usize = 100;
