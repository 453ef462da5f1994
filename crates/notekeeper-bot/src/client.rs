//! Minimal Telegram Bot API client over reqwest.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use notekeeper_core::{Error, Result};

use crate::types::{ApiResponse, GetUpdatesRequest, Message, SendMessageRequest, Update};

/// Extra time on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE_SECS: u64 = 10;

/// Timeout for ordinary calls such as `sendMessage`.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    /// `{api_url}/bot{token}`
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, bot_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), bot_token),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            // reqwest errors can carry the URL, which contains the token
            .map_err(|e| Error::Request(format!("{} failed: {}", method, e.without_url())))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response.json().await.map_err(|e| {
            Error::Request(format!(
                "{} returned {} with an unreadable body: {}",
                method,
                status,
                e.without_url()
            ))
        })?;

        debug!(
            subsystem = "bot",
            component = "telegram_client",
            op = method,
            duration_ms = start.elapsed().as_millis() as u64,
            "Bot API call complete"
        );

        if !parsed.ok {
            let description = parsed.description.unwrap_or_default();
            warn!(
                subsystem = "bot",
                component = "telegram_client",
                op = method,
                status = status.as_u16(),
                error_code = parsed.error_code,
                error = %description,
                "Bot API call rejected"
            );
            return Err(Error::Request(format!(
                "{} rejected ({}): {}",
                method, status, description
            )));
        }
        parsed
            .result
            .ok_or_else(|| Error::Request(format!("{} returned no result", method)))
    }

    /// Long-poll for new updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message".to_string()],
        };
        self.call(
            "getUpdates",
            &body,
            Duration::from_secs(timeout_secs + POLL_GRACE_SECS),
        )
        .await
    }

    pub async fn send_message(&self, request: &SendMessageRequest) -> Result<Message> {
        self.call(
            "sendMessage",
            request,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
        .await
    }
}
