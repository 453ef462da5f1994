//! Long-polling loop that fans updates out to handler tasks.
//!
//! Each update runs in its own task. Updates from the same user in the same
//! chat run one after another, in the order they were received. A handler
//! that fails or panics is logged and answered with an apology; the loop
//! itself keeps going.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use notekeeper_core::Result;

use crate::client::TelegramClient;
use crate::conversation::ConversationKey;
use crate::handlers::{handle_message, BotContext, Reply};
use crate::messages;
use crate::types::{SendMessageRequest, Update};

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct Dispatcher {
    client: TelegramClient,
    ctx: Arc<BotContext>,
    poll_timeout_secs: u64,
}

impl Dispatcher {
    pub fn new(client: TelegramClient, ctx: Arc<BotContext>, poll_timeout_secs: u64) -> Self {
        Self {
            client,
            ctx,
            poll_timeout_secs,
        }
    }

    /// Poll forever.
    pub async fn run(&self) -> Result<()> {
        info!(subsystem = "bot", component = "dispatcher", "Polling for updates");
        let mut offset: Option<i64> = None;
        let mut queue = UpdateQueue::new(self.client.clone(), self.ctx.clone());
        loop {
            let updates = match self
                .client
                .get_updates(offset, self.poll_timeout_secs)
                .await
            {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(
                        subsystem = "bot",
                        component = "dispatcher",
                        error = %e,
                        "getUpdates failed, retrying"
                    );
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = Some(update.update_id + 1);
                queue.push(update);
            }
            queue.prune();

            let purged = self.ctx.conversations.purge_expired(Utc::now()).await;
            if purged > 0 {
                debug!(
                    subsystem = "bot",
                    component = "dispatcher",
                    result_count = purged,
                    "Expired conversations dropped"
                );
            }
        }
    }
}

/// Per-sender ordering for update tasks.
///
/// Each sender's newest task is kept; the next task for that sender waits
/// for it before running. Different senders run concurrently.
pub struct UpdateQueue {
    client: TelegramClient,
    ctx: Arc<BotContext>,
    tails: HashMap<ConversationKey, JoinHandle<()>>,
}

impl UpdateQueue {
    pub fn new(client: TelegramClient, ctx: Arc<BotContext>) -> Self {
        Self {
            client,
            ctx,
            tails: HashMap::new(),
        }
    }

    /// Spawn the task for `update` behind any earlier task from the same sender.
    pub fn push(&mut self, update: Update) {
        let Some(message) = update.message.as_ref() else {
            return;
        };
        let key: ConversationKey = (
            message.chat.id,
            message.from.as_ref().map(|u| u.id).unwrap_or_default(),
        );
        let previous = self.tails.remove(&key);
        let client = self.client.clone();
        let ctx = self.ctx.clone();
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                // only ordering matters here; its outcome was logged
                let _ = previous.await;
            }
            process_update(&client, ctx, update).await;
        });
        self.tails.insert(key, handle);
    }

    /// Forget senders whose last task has finished.
    pub fn prune(&mut self) {
        self.tails.retain(|_, handle| !handle.is_finished());
    }

    /// Wait for every queued task.
    pub async fn drain(&mut self) {
        for (_, handle) in self.tails.drain() {
            let _ = handle.await;
        }
    }

    pub fn pending_senders(&self) -> usize {
        self.tails.len()
    }
}

/// Handle one update and send its reply. Never fails.
pub async fn process_update(client: &TelegramClient, ctx: Arc<BotContext>, update: Update) {
    let Some(message) = update.message else {
        return;
    };
    let chat_id = message.chat.id;

    // run the handler in its own task so a panic is caught as a JoinError
    let handler = tokio::spawn(async move { handle_message(&ctx, &message).await });

    let reply = match handler.await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            error!(
                subsystem = "bot",
                component = "dispatcher",
                update_id = update.update_id,
                chat_id,
                error = %e,
                "Handler failed"
            );
            Some(Reply::text(messages::APOLOGY))
        }
        Err(join_err) => {
            error!(
                subsystem = "bot",
                component = "dispatcher",
                update_id = update.update_id,
                chat_id,
                error = %join_err,
                "Handler panicked"
            );
            Some(Reply::text(messages::APOLOGY))
        }
    };

    if let Some(reply) = reply {
        let request = SendMessageRequest {
            chat_id,
            text: reply.text,
            parse_mode: reply.parse_mode.map(str::to_string),
            disable_web_page_preview: reply.disable_preview,
        };
        if let Err(e) = client.send_message(&request).await {
            warn!(
                subsystem = "bot",
                component = "dispatcher",
                chat_id,
                error = %e,
                "Failed to send reply"
            );
        }
    }
}
