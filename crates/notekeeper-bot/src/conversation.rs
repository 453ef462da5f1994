//! Short-lived state for the two-step `/new` note capture.
//!
//! State is keyed by (chat, user) and dropped after a period of inactivity.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Identifies one user's conversation in one chat.
pub type ConversationKey = (i64, i64);

/// Where a capture conversation currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    AwaitingTitle,
    AwaitingContent { title: String },
}

#[derive(Debug)]
struct Entry {
    step: Step,
    touched: DateTime<Utc>,
}

pub struct Conversations {
    entries: Mutex<HashMap<ConversationKey, Entry>>,
    ttl: Duration,
}

impl Conversations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Set the step for `key`, replacing any earlier state.
    pub async fn set(&self, key: ConversationKey, step: Step, now: DateTime<Utc>) {
        self.entries
            .lock()
            .await
            .insert(key, Entry { step, touched: now });
    }

    /// Remove and return the current step. Of two callers racing on the
    /// same key, only one gets the step.
    pub async fn take(&self, key: ConversationKey, now: DateTime<Utc>) -> Option<Step> {
        let entry = self.entries.lock().await.remove(&key)?;
        (now - entry.touched <= self.ttl).then_some(entry.step)
    }

    /// Drop expired conversations; returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now - entry.touched <= self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_steps_advance() {
        let convs = Conversations::new(Duration::minutes(10));
        let now = Utc::now();
        let key = (1, 2);

        assert_eq!(convs.take(key, now).await, None);
        convs.set(key, Step::AwaitingTitle, now).await;
        assert_eq!(convs.take(key, now).await, Some(Step::AwaitingTitle));

        let title = Step::AwaitingContent {
            title: "Milk".to_string(),
        };
        convs.set(key, title.clone(), now).await;
        assert_eq!(convs.take(key, now).await, Some(title));
        assert!(convs.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_hands_out_step_once() {
        let convs = Conversations::new(Duration::minutes(10));
        let now = Utc::now();
        convs.set((1, 2), Step::AwaitingTitle, now).await;

        let (a, b) = tokio::join!(convs.take((1, 2), now), convs.take((1, 2), now));
        assert_eq!(a.is_some() as u8 + b.is_some() as u8, 1);
        assert!(convs.is_empty().await);
    }

    #[tokio::test]
    async fn test_state_is_per_chat_and_user() {
        let convs = Conversations::new(Duration::minutes(10));
        let now = Utc::now();
        convs.set((1, 2), Step::AwaitingTitle, now).await;
        assert_eq!(convs.take((1, 3), now).await, None);
        assert_eq!(convs.take((5, 2), now).await, None);
        assert_eq!(convs.len().await, 1);
    }

    #[tokio::test]
    async fn test_state_expires() {
        let convs = Conversations::new(Duration::minutes(10));
        let start = Utc::now();
        convs.set((1, 2), Step::AwaitingTitle, start).await;
        convs.set((3, 4), Step::AwaitingTitle, start + Duration::minutes(8)).await;

        let later = start + Duration::minutes(11);
        assert_eq!(convs.take((1, 2), later).await, None);
        assert_eq!(convs.len().await, 1);
        assert_eq!(convs.purge_expired(start + Duration::minutes(30)).await, 1);
        assert!(convs.is_empty().await);
    }
}
