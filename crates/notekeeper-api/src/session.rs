//! Session issuance and request authentication.
//!
//! Both login paths end in [`SessionIssuer::issue`], which hands out an opaque
//! token. Browsers carry it in the `notekeeper_session` cookie; REST clients
//! may send it as `Authorization: Bearer <token>` instead.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use notekeeper_core::defaults::SESSION_COOKIE_NAME;
use notekeeper_core::{Account, AccountId, Error, Result, SessionRepository};
use notekeeper_crypto::{generate_session_token, hash_token, looks_like_session_token};

use crate::{ApiError, AppState};

/// Issues, resolves, and revokes session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    repo: Arc<dyn SessionRepository>,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(repo: Arc<dyn SessionRepository>, ttl: Duration) -> Self {
        Self { repo, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for `account_id`; returns the token to hand to the client.
    pub async fn issue(&self, account_id: AccountId) -> Result<String> {
        let token = generate_session_token();
        let expires_at = Utc::now() + self.ttl;
        self.repo
            .insert(&hash_token(&token), account_id, expires_at)
            .await?;
        info!(
            subsystem = "auth",
            component = "session",
            op = "issue",
            account_id,
            "Session issued"
        );
        Ok(token)
    }

    /// Account behind an unexpired token.
    pub async fn resolve(&self, token: &str) -> Result<Option<AccountId>> {
        if !looks_like_session_token(token) {
            return Ok(None);
        }
        self.repo.account_for(&hash_token(token), Utc::now()).await
    }

    /// End a session. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        self.repo.delete(&hash_token(token)).await
    }

    /// Drop expired sessions; returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.repo.purge_expired(Utc::now()).await
    }
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        SESSION_COOKIE_NAME,
        token,
        ttl.num_seconds().max(0),
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
        SESSION_COOKIE_NAME,
        if secure { "; Secure" } else { "" }
    )
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Session token from a Bearer header or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    bearer.or_else(|| cookie_value(headers, SESSION_COOKIE_NAME))
}

/// Resolve the request's session to an active account.
async fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Option<Account>> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    let Some(account_id) = state.sessions.resolve(&token).await? else {
        debug!(subsystem = "auth", component = "session", "Unknown or expired session");
        return Ok(None);
    };
    match state.store.accounts.get(account_id).await {
        Ok(account) if account.is_active => Ok(Some(account)),
        Ok(account) => {
            warn!(
                subsystem = "auth",
                component = "session",
                account_id = account.id,
                "Session for inactive account"
            );
            Ok(None)
        }
        Err(Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Authenticated account for REST handlers; rejects with 401 JSON.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        authenticate(&parts.headers, state)
            .await?
            .map(CurrentAccount)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// Authenticated account for HTML pages; redirects to the login page.
#[derive(Debug, Clone)]
pub struct WebAccount(pub Account);

#[axum::async_trait]
impl FromRequestParts<AppState> for WebAccount {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        match authenticate(&parts.headers, state).await {
            Ok(Some(account)) => Ok(WebAccount(account)),
            Ok(None) => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                let location = format!("/accounts/login/?next={}", urlencoding::encode(next));
                Err(Redirect::to(&location).into_response())
            }
            Err(e) => Err(ApiError::from(e).into_response()),
        }
    }
}

/// Account if the request carries a valid session, for public pages.
#[derive(Debug, Clone)]
pub struct MaybeAccount(pub Option<Account>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(MaybeAccount(authenticate(&parts.headers, state).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use notekeeper_db::MemoryStore;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("nk_s_abc", Duration::hours(1), false);
        assert_eq!(
            cookie,
            "notekeeper_session=nk_s_abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600"
        );
        assert!(session_cookie("t", Duration::hours(1), true).ends_with("; Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn test_token_from_cookie_or_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; notekeeper_session=nk_s_cookie"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("nk_s_cookie"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer nk_s_bearer"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("nk_s_bearer"));
    }

    #[tokio::test]
    async fn test_issue_resolve_revoke() {
        let store = MemoryStore::new().store();
        let issuer = SessionIssuer::new(store.sessions.clone(), Duration::hours(1));

        let token = issuer.issue(7).await.unwrap();
        assert_eq!(issuer.resolve(&token).await.unwrap(), Some(7));
        assert_eq!(issuer.resolve("nk_s_forged").await.unwrap(), None);

        issuer.revoke(&token).await.unwrap();
        assert_eq!(issuer.resolve(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_session_does_not_resolve() {
        let store = MemoryStore::new().store();
        let issuer = SessionIssuer::new(store.sessions.clone(), Duration::seconds(-1));
        let token = issuer.issue(7).await.unwrap();
        assert_eq!(issuer.resolve(&token).await.unwrap(), None);
        assert_eq!(issuer.purge_expired().await.unwrap(), 1);
    }
}
