//! Core traits for notekeeper storage.
//!
//! One repository per entity. Every note, category, and tag operation takes
//! the owning account id and must never read or write another account's rows;
//! a row owned by someone else is reported as `Error::NotFound`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::*;

// =============================================================================
// ACCOUNT REPOSITORY
// =============================================================================

/// Repository for accounts and identity reconciliation.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create a password account. Fails with `Error::Conflict` if the
    /// username is taken.
    async fn create_with_password(&self, req: NewAccount) -> Result<Account>;

    /// Fetch an account by id.
    async fn get(&self, id: AccountId) -> Result<Account>;

    /// Look up the account linked to a chat-platform id.
    async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Account>>;

    /// Account and password hash for a username (password login).
    async fn credentials(&self, username: &str) -> Result<Option<AccountCredentials>>;

    /// Atomically fetch-or-create the account for a verified external identity.
    ///
    /// A created account gets the placeholder username `tg_<id>` and no
    /// password. Repeated calls with the same id return the first-created
    /// account unchanged.
    async fn reconcile_external(&self, profile: &ExternalProfile) -> Result<Reconciled>;
}

// =============================================================================
// NOTE REPOSITORY
// =============================================================================

/// Owner-scoped note CRUD.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a note for `owner`.
    async fn create(&self, owner: AccountId, input: NoteInput) -> Result<Note>;

    /// Fetch one of `owner`'s notes.
    async fn get(&self, owner: AccountId, id: i64) -> Result<Note>;

    /// List `owner`'s notes, newest first.
    async fn list(&self, owner: AccountId, req: ListNotesRequest) -> Result<Vec<Note>>;

    /// Case-insensitive substring search over title, content, and tag names.
    /// Results are distinct and newest first.
    async fn search(&self, owner: AccountId, query: &str, limit: i64) -> Result<Vec<Note>>;

    /// Replace a note's fields.
    async fn update(&self, owner: AccountId, id: i64, input: NoteInput) -> Result<Note>;

    /// Set or clear only the deadline.
    async fn set_deadline(
        &self,
        owner: AccountId,
        id: i64,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Note>;

    /// Delete a note.
    async fn delete(&self, owner: AccountId, id: i64) -> Result<()>;
}

// =============================================================================
// LABEL REPOSITORIES
// =============================================================================

/// Owner-scoped category CRUD. Names are unique per account.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, owner: AccountId, name: &str) -> Result<Category>;
    async fn get(&self, owner: AccountId, id: i64) -> Result<Category>;
    /// All of `owner`'s categories, sorted by name.
    async fn list(&self, owner: AccountId) -> Result<Vec<Category>>;
    async fn rename(&self, owner: AccountId, id: i64, name: &str) -> Result<Category>;
    /// Delete a category; notes that used it keep existing without one.
    async fn delete(&self, owner: AccountId, id: i64) -> Result<()>;
    /// Return the category with this name, creating it if absent.
    async fn get_or_create(&self, owner: AccountId, name: &str) -> Result<Category>;
}

/// Owner-scoped tag CRUD. Names are unique per account.
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, owner: AccountId, name: &str) -> Result<Tag>;
    async fn get(&self, owner: AccountId, id: i64) -> Result<Tag>;
    /// All of `owner`'s tags, sorted by name.
    async fn list(&self, owner: AccountId) -> Result<Vec<Tag>>;
    async fn rename(&self, owner: AccountId, id: i64, name: &str) -> Result<Tag>;
    /// Delete a tag and detach it from every note.
    async fn delete(&self, owner: AccountId, id: i64) -> Result<()>;
    /// Return the tag with this name, creating it if absent.
    async fn get_or_create(&self, owner: AccountId, name: &str) -> Result<Tag>;
}

// =============================================================================
// SESSION REPOSITORY
// =============================================================================

/// Storage for issued session tokens. Only token hashes are stored.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Record a new session.
    async fn insert(
        &self,
        token_hash: &str,
        account_id: AccountId,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Account owning an unexpired session.
    async fn account_for(&self, token_hash: &str, now: DateTime<Utc>)
        -> Result<Option<AccountId>>;

    /// Remove a session (logout). Unknown hashes are ignored.
    async fn delete(&self, token_hash: &str) -> Result<()>;

    /// Remove all sessions expired at `now`; returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

// =============================================================================
// STORE
// =============================================================================

/// Bundle of repository handles passed through request and bot state.
#[derive(Clone)]
pub struct Store {
    pub accounts: Arc<dyn AccountRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}
