//! HTTP handlers for notekeeper-api.
//!
//! `notes`, `export`, and `accounts` serve the HTML interface; `telegram`
//! holds the chat-identity login endpoints; `api` is the JSON REST surface.

pub mod accounts;
pub mod api;
pub mod export;
pub mod notes;
pub mod telegram;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;

use notekeeper_core::{Account, Error};

use crate::views;

/// Render a storage error as an HTML page.
pub(crate) fn page_error(err: Error, account: Option<&Account>) -> Response {
    match err {
        Error::NotFound(_) => views::error_page(
            StatusCode::NOT_FOUND,
            "Страница не найдена.",
            account,
        ),
        Error::InvalidInput(msg) | Error::Conflict(msg) => {
            views::error_page(StatusCode::BAD_REQUEST, &msg, account)
        }
        other => {
            error!(subsystem = "api", component = "web", error = %other, "Page request failed");
            views::error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Произошла ошибка. Попробуйте позже.",
                account,
            )
        }
    }
}

/// Redirect that also sets (or clears) the session cookie.
pub(crate) fn redirect_with_cookie(location: &str, cookie: String) -> Response {
    ([(header::SET_COOKIE, cookie)], Redirect::to(location)).into_response()
}

/// Only same-site relative paths are accepted as post-login targets.
pub(crate) fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n,
        _ => "/",
    }
}
