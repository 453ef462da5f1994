//! Shared application state.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};

use notekeeper_core::{Settings, Store};
use notekeeper_crypto::widget_secret;

use crate::session::SessionIssuer;

pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub settings: Arc<Settings>,
    pub sessions: SessionIssuer,
    /// HMAC key for login-widget payloads, derived once from the bot token.
    pub widget_secret: Arc<[u8; 32]>,
    /// Limiter for the authentication endpoints (None if disabled).
    pub auth_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    pub fn new(store: Store, settings: Settings) -> Self {
        let sessions = SessionIssuer::new(store.sessions.clone(), settings.session_ttl);
        let widget_secret = Arc::new(widget_secret(&settings.telegram.bot_token));
        let auth_limiter = build_limiter(&settings);
        Self {
            store,
            settings: Arc::new(settings),
            sessions,
            widget_secret,
            auth_limiter,
        }
    }
}

fn build_limiter(settings: &Settings) -> Option<Arc<GlobalRateLimiter>> {
    let rl = &settings.rate_limit;
    if !rl.enabled {
        return None;
    }
    let burst = NonZeroU32::new(u32::try_from(rl.requests).unwrap_or(u32::MAX))?;
    // one cell replenishes every period / requests
    let replenish = Duration::from_millis(rl.period_secs.max(1) * 1000 / rl.requests.max(1));
    let quota = Quota::with_period(replenish)?.allow_burst(burst);
    Some(Arc::new(RateLimiter::direct(quota)))
}
