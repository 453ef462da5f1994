//! Shared helpers for in-process router tests over the in-memory store.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use tower::ServiceExt;

use notekeeper_api::{router, AppState};
use notekeeper_core::{Account, NewAccount, Settings};
use notekeeper_crypto::{hash_password, sign_payload, widget_secret};
use notekeeper_db::MemoryStore;

pub const BOT_TOKEN: &str = "123456:TEST-token";
pub const SECRET_KEY: &str = "test-signing-secret";
pub const WEBAPP_URL: &str = "http://notes.test";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub memory: MemoryStore,
}

pub fn test_settings(overrides: &[(&str, &str)]) -> Settings {
    let mut vars: HashMap<String, String> = [
        ("TELEGRAM_BOT_TOKEN", BOT_TOKEN),
        ("TELEGRAM_BOT_USERNAME", "@notes_test_bot"),
        ("SECRET_KEY", SECRET_KEY),
        ("DATABASE_URL", "postgres://unused/unused"),
        ("WEBAPP_URL", WEBAPP_URL),
        ("RATE_LIMIT_ENABLED", "false"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    Settings::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub fn test_app() -> TestApp {
    test_app_with(&[])
}

pub fn test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let memory = MemoryStore::new();
    let state = AppState::new(memory.store(), test_settings(overrides));
    TestApp {
        app: router(state.clone()),
        state,
        memory,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Password account plus a live session token for it.
    pub async fn account_with_session(&self, username: &str) -> (Account, String) {
        let account = self
            .state
            .store
            .accounts
            .create_with_password(NewAccount {
                username: username.to_string(),
                password_hash: hash_password("correct horse").unwrap(),
            })
            .await
            .unwrap();
        let token = self.state.sessions.issue(account.id).await.unwrap();
        (account, token)
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn with_cookie(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::COOKIE,
        format!("notekeeper_session={}", token).parse().unwrap(),
    );
    request
}

pub fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

pub fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Session token from a `Set-Cookie` header, if one was set.
pub fn session_from(response: &Response<Body>) -> Option<String> {
    let cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let value = cookie.split(';').next()?.strip_prefix("notekeeper_session=")?;
    (!value.is_empty()).then(|| value.to_string())
}

/// Login-widget fields signed with the test bot token.
pub fn signed_widget_fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let hash = sign_payload(&fields, &widget_secret(BOT_TOKEN));
    fields.insert("hash".to_string(), hash);
    fields
}

pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
