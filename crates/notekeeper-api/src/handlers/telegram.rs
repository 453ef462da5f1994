//! Chat-identity login: the login-widget callbacks and bot-issued links.
//!
//! Every path verifies the identity first, then reconciles it into a local
//! account, then issues a session. A failed verification never touches the
//! account table.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use notekeeper_core::{Account, Error, ExternalProfile};
use notekeeper_crypto::{is_fresh, verify_login_link, verify_signed_payload};

use crate::handlers::redirect_with_cookie;
use crate::session::session_cookie;
use crate::views;
use crate::AppState;

const LOGIN_PAGE: &str = "/auth/telegram/";

/// Why a chat login was refused.
#[derive(Debug)]
pub enum LoginFailure {
    /// Bad signature or malformed payload.
    InvalidSignature,
    /// Signed, but `auth_date` is too old or in the future.
    Expired,
    /// Verified, but the local account is disabled.
    Inactive,
    Internal(Error),
}

impl LoginFailure {
    fn message(&self) -> &'static str {
        match self {
            LoginFailure::InvalidSignature => "Invalid Telegram hash",
            LoginFailure::Expired => "Telegram authorization has expired",
            LoginFailure::Inactive => "Account is disabled",
            LoginFailure::Internal(_) => "Internal server error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            LoginFailure::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::FORBIDDEN,
        }
    }

    fn query_code(&self) -> &'static str {
        match self {
            LoginFailure::InvalidSignature => "invalid",
            LoginFailure::Expired => "expired",
            LoginFailure::Inactive => "inactive",
            LoginFailure::Internal(_) => "internal",
        }
    }
}

impl From<Error> for LoginFailure {
    fn from(err: Error) -> Self {
        LoginFailure::Internal(err)
    }
}

/// Flatten a JSON widget payload into string fields.
///
/// The widget sends `id` and `auth_date` as numbers; they are signed in their
/// decimal text form. Nulls are treated as absent. Nested values are invalid.
pub fn payload_fields(
    payload: serde_json::Map<String, Value>,
) -> Option<BTreeMap<String, String>> {
    let mut fields = BTreeMap::new();
    for (key, value) in payload {
        let text = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => continue,
            Value::Array(_) | Value::Object(_) => return None,
        };
        fields.insert(key, text);
    }
    Some(fields)
}

/// Reconcile a verified identity and check the account may log in.
async fn reconcile(state: &AppState, profile: &ExternalProfile) -> Result<Account, LoginFailure> {
    let reconciled = state.store.accounts.reconcile_external(profile).await?;
    if !reconciled.account.is_active {
        warn!(
            subsystem = "api",
            component = "telegram_auth",
            account_id = reconciled.account.id,
            "Chat login for inactive account"
        );
        return Err(LoginFailure::Inactive);
    }
    Ok(reconciled.account)
}

/// Verify signed widget fields and resolve them to an account.
pub async fn verify_and_reconcile(
    state: &AppState,
    fields: &BTreeMap<String, String>,
) -> Result<Account, LoginFailure> {
    if !verify_signed_payload(fields, state.widget_secret.as_slice()) {
        return Err(LoginFailure::InvalidSignature);
    }
    let auth_date = fields.get("auth_date").map(String::as_str).unwrap_or("");
    if !is_fresh(
        auth_date,
        Utc::now().timestamp(),
        state.settings.telegram.auth_max_age_secs,
    ) {
        return Err(LoginFailure::Expired);
    }
    let profile =
        ExternalProfile::from_fields(fields).map_err(|_| LoginFailure::InvalidSignature)?;
    reconcile(state, &profile).await
}

/// Start a session and build its cookie.
async fn start_session(state: &AppState, account: &Account) -> Result<String, LoginFailure> {
    let token = state.sessions.issue(account.id).await?;
    info!(
        subsystem = "api",
        component = "telegram_auth",
        op = "login",
        account_id = account.id,
        "Chat identity login"
    );
    let settings = &state.settings;
    Ok(session_cookie(
        &token,
        settings.session_ttl,
        settings.session_cookie_secure,
    ))
}

fn failure_redirect(failure: &LoginFailure) -> Response {
    if let LoginFailure::Internal(e) = failure {
        tracing::error!(subsystem = "api", component = "telegram_auth", error = %e, "Chat login failed");
    }
    Redirect::to(&format!("{}?error={}", LOGIN_PAGE, failure.query_code())).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
}

pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginPageQuery>,
) -> Html<String> {
    let error = query
        .error
        .map(|_| "Не удалось выполнить вход через Telegram. Попробуйте еще раз.");
    Html(views::telegram_login(
        &state.settings.telegram.bot_username,
        error,
    ))
}

/// JSON callback from the login widget's `onauth` hook.
pub async fn widget_callback(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Map<String, Value>>,
) -> Response {
    let result = match payload_fields(payload) {
        Some(fields) => verify_and_reconcile(&state, &fields).await,
        None => Err(LoginFailure::InvalidSignature),
    };
    let cookie = match result {
        Ok(account) => start_session(&state, &account).await,
        Err(e) => Err(e),
    };
    match cookie {
        Ok(cookie) => (
            [(header::SET_COOKIE, cookie)],
            Json(json!({ "status": "success", "redirect_url": "/" })),
        )
            .into_response(),
        Err(failure) => {
            if let LoginFailure::Internal(e) = &failure {
                tracing::error!(subsystem = "api", component = "telegram_auth", error = %e, "Chat login failed");
            }
            (
                failure.status(),
                Json(json!({ "status": "error", "message": failure.message() })),
            )
                .into_response()
        }
    }
}

/// Redirect callback from the login widget's `auth-url` mode.
pub async fn complete(
    State(state): State<AppState>,
    Query(fields): Query<BTreeMap<String, String>>,
) -> Response {
    let account = match verify_and_reconcile(&state, &fields).await {
        Ok(account) => account,
        Err(failure) => return failure_redirect(&failure),
    };
    match start_session(&state, &account).await {
        Ok(cookie) => redirect_with_cookie("/", cookie),
        Err(failure) => failure_redirect(&failure),
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    pub telegram_id: Option<String>,
    pub timestamp: Option<String>,
    pub token: Option<String>,
}

impl LinkQuery {
    fn parse(&self) -> Option<(i64, i64, &str)> {
        let telegram_id = self.telegram_id.as_deref()?.trim().parse::<i64>().ok()?;
        let timestamp = self.timestamp.as_deref()?.trim().parse::<i64>().ok()?;
        let token = self.token.as_deref()?;
        Some((telegram_id, timestamp, token))
    }
}

/// One-click login link sent by the bot's `/web_login` command.
pub async fn link_login(State(state): State<AppState>, Query(query): Query<LinkQuery>) -> Response {
    let Some((telegram_id, timestamp, token)) = query.parse() else {
        return failure_redirect(&LoginFailure::InvalidSignature);
    };

    let now = Utc::now().timestamp();
    if !verify_login_link(
        state.settings.secret_key.as_bytes(),
        telegram_id,
        timestamp,
        token,
        now,
    ) {
        return failure_redirect(&LoginFailure::InvalidSignature);
    }

    let account = match reconcile(&state, &ExternalProfile::from_id(telegram_id)).await {
        Ok(account) => account,
        Err(failure) => return failure_redirect(&failure),
    };
    match start_session(&state, &account).await {
        Ok(cookie) => redirect_with_cookie("/", cookie),
        Err(failure) => failure_redirect(&failure),
    }
}
