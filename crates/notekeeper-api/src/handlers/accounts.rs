//! Password registration, login, and logout.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::{info, warn};

use notekeeper_core::validation::{validate_password, validate_username};
use notekeeper_core::{Error, NewAccount};
use notekeeper_crypto::{hash_password, verify_password};

use crate::handlers::{page_error, redirect_with_cookie, safe_next};
use crate::session::{clear_session_cookie, session_cookie, session_token};
use crate::views;
use crate::AppState;

const BAD_CREDENTIALS: &str = "Неверное имя пользователя или пароль.";

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

pub async fn register_form() -> Html<String> {
    Html(views::register_form(None, ""))
}

pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let username = form.username.trim();
    let rerender = |status: StatusCode, msg: &str| {
        (status, Html(views::register_form(Some(msg), username))).into_response()
    };

    if let Err(e) = validate_username(username)
        .and_then(|_| validate_password(&form.password1, &form.password2))
    {
        return match e {
            Error::InvalidInput(msg) => rerender(StatusCode::BAD_REQUEST, &msg),
            other => page_error(other, None),
        };
    }

    let password_hash = match hash_password(&form.password1) {
        Ok(hash) => hash,
        Err(e) => return page_error(e.into(), None),
    };
    let req = NewAccount {
        username: username.to_string(),
        password_hash,
    };
    match state.store.accounts.create_with_password(req).await {
        Ok(account) => {
            info!(
                subsystem = "api",
                component = "accounts",
                op = "register",
                account_id = account.id,
                "Account registered"
            );
            Redirect::to("/accounts/login/").into_response()
        }
        Err(Error::Conflict(_)) => rerender(
            StatusCode::CONFLICT,
            "Пользователь с таким именем уже существует.",
        ),
        Err(e) => page_error(e, None),
    }
}

pub async fn login_form(Query(query): Query<NextQuery>) -> Html<String> {
    Html(views::login_form(
        None,
        "",
        safe_next(query.next.as_deref()),
    ))
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let next = safe_next(form.next.as_deref());
    let username = form.username.trim();
    let denied = || {
        (
            StatusCode::UNAUTHORIZED,
            Html(views::login_form(Some(BAD_CREDENTIALS), username, next)),
        )
            .into_response()
    };

    let credentials = match state.store.accounts.credentials(username).await {
        Ok(Some(c)) => c,
        Ok(None) => return denied(),
        Err(e) => return page_error(e, None),
    };
    // chat-created accounts have no usable password
    let Some(stored) = credentials.password_hash.as_deref() else {
        warn!(
            subsystem = "api",
            component = "accounts",
            op = "login",
            account_id = credentials.account.id,
            "Password login for account without password"
        );
        return denied();
    };
    match verify_password(&form.password, stored) {
        Ok(true) if credentials.account.is_active => {}
        Ok(_) => return denied(),
        Err(e) => return page_error(e.into(), None),
    }

    match state.sessions.issue(credentials.account.id).await {
        Ok(token) => {
            info!(
                subsystem = "api",
                component = "accounts",
                op = "login",
                account_id = credentials.account.id,
                "Password login"
            );
            let settings = &state.settings;
            redirect_with_cookie(
                next,
                session_cookie(&token, settings.session_ttl, settings.session_cookie_secure),
            )
        }
        Err(e) => page_error(e, None),
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.sessions.revoke(&token).await {
            return page_error(e, None);
        }
    }
    redirect_with_cookie(
        "/accounts/login/",
        clear_session_cookie(state.settings.session_cookie_secure),
    )
}
