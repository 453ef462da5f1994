//! Core data models for notekeeper.
//!
//! These types are shared by the storage backends, the web server, and the
//! bot. Every note, category, and tag belongs to exactly one account; the
//! owner is never serialized because every API is already scoped to it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::EXTERNAL_USERNAME_PREFIX;
use crate::error::{Error, Result};

/// Local account identifier.
pub type AccountId = i64;

// =============================================================================
// ACCOUNT TYPES
// =============================================================================

/// A registered user, optionally linked to a chat-platform identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Account {
    pub id: AccountId,
    /// Unique login name; chat-created accounts get `tg_<telegram_id>`.
    pub username: String,
    /// Chat-platform numeric user id (unique when present).
    pub telegram_id: Option<i64>,
    pub telegram_username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    /// False for accounts that can only log in through chat verification.
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Name shown in the UI and in bot greetings.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// Whether this account is linked to a chat identity.
    pub fn is_telegram_user(&self) -> bool {
        self.telegram_id.is_some()
    }
}

/// Account plus its stored password hash, used only by the password login path.
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account: Account,
    /// PHC-format Argon2 hash; `None` means the password is unusable.
    pub password_hash: Option<String>,
}

/// Request to create a password account through web registration.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
}

/// Profile fields carried by a verified chat-platform identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
}

impl ExternalProfile {
    /// Profile with only the external id known (bot link logins).
    pub fn from_id(telegram_id: i64) -> Self {
        Self {
            telegram_id,
            first_name: String::new(),
            last_name: String::new(),
            username: None,
        }
    }

    /// Build a profile from verified login-widget fields.
    ///
    /// Only `id` is required; it must be a decimal integer.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self> {
        let raw_id = fields
            .get("id")
            .ok_or_else(|| Error::InvalidInput("missing field: id".to_string()))?;
        let telegram_id = raw_id
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::InvalidInput(format!("invalid id: {}", raw_id)))?;

        let text = |key: &str| fields.get(key).cloned().unwrap_or_default();
        let username = fields
            .get("username")
            .filter(|u| !u.is_empty())
            .cloned();

        Ok(Self {
            telegram_id,
            first_name: text("first_name"),
            last_name: text("last_name"),
            username,
        })
    }

    /// Placeholder username for an account created from this identity.
    pub fn placeholder_username(&self) -> String {
        format!("{}{}", EXTERNAL_USERNAME_PREFIX, self.telegram_id)
    }
}

/// Outcome of fetch-or-create on an external identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub account: Account,
    /// True when this call inserted the account.
    pub created: bool,
}

// =============================================================================
// LABEL TYPES
// =============================================================================

/// A per-account category; a note has at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A per-account tag; a note has any number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Request body for creating or renaming a category or tag.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LabelInput {
    pub name: String,
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A note with its category and tags resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

impl Note {
    /// Whether the deadline lies before `now`.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map(|d| d < now).unwrap_or(false)
    }

    /// Whether the deadline has already passed.
    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }

    /// Comma-separated tag names, in stored order.
    pub fn tag_names(&self) -> String {
        self.tags
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Fields written when creating or updating a note.
///
/// `category_id` and `tag_ids` must reference labels owned by the same
/// account; anything else is rejected as invalid input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteInput {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

impl NoteInput {
    /// Title and body only; used by the bot's capture flow.
    pub fn text(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Request for listing notes (newest first).
#[derive(Debug, Clone, Default)]
pub struct ListNotesRequest {
    /// Maximum results (None = all)
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

impl ListNotesRequest {
    /// The newest `limit` notes.
    pub fn recent(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn account(first: &str, last: &str) -> Account {
        Account {
            id: 1,
            username: "tg_123".to_string(),
            telegram_id: Some(123),
            telegram_username: None,
            first_name: first.to_string(),
            last_name: last.to_string(),
            is_active: true,
            has_password: false,
            created_at: Utc::now(),
        }
    }

    fn note(deadline: Option<DateTime<Utc>>) -> Note {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        Note {
            id: 1,
            title: "t".to_string(),
            content: "c".to_string(),
            created_at: now,
            updated_at: now,
            deadline,
            category: None,
            tags: vec![
                Tag {
                    id: 1,
                    name: "work".to_string(),
                },
                Tag {
                    id: 2,
                    name: "urgent".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_display_name_prefers_real_name() {
        assert_eq!(account("Ann", "Lee").display_name(), "Ann Lee");
        assert_eq!(account("Ann", "").display_name(), "Ann");
        assert_eq!(account("", "").display_name(), "tg_123");
    }

    #[test]
    fn test_profile_from_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), "123".to_string());
        fields.insert("first_name".to_string(), "Ann".to_string());
        fields.insert("username".to_string(), "".to_string());

        let profile = ExternalProfile::from_fields(&fields).unwrap();
        assert_eq!(profile.telegram_id, 123);
        assert_eq!(profile.first_name, "Ann");
        assert_eq!(profile.last_name, "");
        assert_eq!(profile.username, None);
        assert_eq!(profile.placeholder_username(), "tg_123");
    }

    #[test]
    fn test_profile_from_fields_rejects_missing_or_bad_id() {
        let fields = BTreeMap::new();
        assert!(matches!(
            ExternalProfile::from_fields(&fields),
            Err(Error::InvalidInput(_))
        ));

        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), "12a".to_string());
        assert!(matches!(
            ExternalProfile::from_fields(&fields),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_note_overdue() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        assert!(!note(None).is_overdue_at(now));
        assert!(note(Some(now - Duration::days(1))).is_overdue_at(now));
        assert!(!note(Some(now + Duration::days(1))).is_overdue_at(now));
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(note(None).tag_names(), "work, urgent");
    }

    #[test]
    fn test_note_input_deserialize_defaults() {
        let input: NoteInput = serde_json::from_str(r#"{"title": "Hi"}"#).unwrap();
        assert_eq!(input, NoteInput::text("Hi", ""));
    }
}
