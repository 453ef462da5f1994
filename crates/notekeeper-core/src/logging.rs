//! Structured logging schema and subscriber setup.
//!
//! The web server and the bot log with the same field names, so log
//! aggregation can query both the same way.
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `request_id` | UUIDv7 set by the request-id layer |
//! | `subsystem` | `api`, `db`, `bot` or `crypto` |
//! | `component` | part of the subsystem, e.g. `session`, `widget`, `dispatcher` |
//! | `op` | logical operation, e.g. `verify`, `reconcile`, `getUpdates` |
//! | `account_id`, `telegram_id`, `chat_id`, `note_id` | entity ids |
//! | `command` | bot command name |
//! | `duration_ms`, `result_count` | measurements |
//! | `error` | error message of a failed operation |
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, request denied (bad signature, expired link) |
//! | INFO  | Lifecycle events (startup, shutdown), logins, account creation |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, raw updates |

use std::path::{Path, PathBuf};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Directory and file name prefix for a `LOG_FILE` value. A value ending in
/// a separator names a directory and gets `default_file_name`.
fn log_file_target(path: &str, default_file_name: &str) -> (PathBuf, String) {
    if path.ends_with('/') || path.ends_with(std::path::MAIN_SEPARATOR) {
        return (PathBuf::from(path), default_file_name.to_string());
    }
    let path = Path::new(path);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(default_file_name)
        .to_string();
    (dir, file_name)
}

/// Initialize the global tracing subscriber.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables daily-rotated file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: `default_filter`)
///
/// The returned guard must be held for the life of the process when file
/// logging is enabled, otherwise buffered lines are lost.
pub fn init_tracing(
    default_filter: &str,
    default_file_name: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let (file_dir, file_name) = log_file_target(path, default_file_name);
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            // no ANSI in files unless asked for
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    tracing::info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    guard
}
