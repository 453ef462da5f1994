//! # notekeeper-db
//!
//! Storage layer for notekeeper.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL implementations of every repository trait
//! - Atomic reconciliation of chat identities into accounts
//! - An in-memory backend with the same semantics, for tests and demos
//!
//! ## Example
//!
//! ```rust,ignore
//! use notekeeper_db::{Database, NoteInput};
//!
//! let db = Database::connect("postgres://localhost/notes_db").await?;
//! db.migrate().await?;
//! let store = db.store();
//! let note = store.notes.create(account_id, NoteInput::text("Hello", "world")).await?;
//! ```

pub mod accounts;
pub mod labels;
pub mod memory;
pub mod notes;
pub mod pool;
pub mod sessions;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use std::sync::Arc;

pub use notekeeper_core::*;

pub use accounts::PgAccountRepository;
pub use labels::{PgCategoryRepository, PgTagRepository};
pub use memory::MemoryStore;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use sessions::PgSessionRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Map a write failure, turning unique violations into `Error::Conflict`.
pub(crate) fn map_write_error(e: sqlx::Error, conflict: impl FnOnce() -> String) -> Error {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return Error::Conflict(conflict());
        }
    }
    Error::Database(e)
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub accounts: PgAccountRepository,
    pub notes: PgNoteRepository,
    pub categories: PgCategoryRepository,
    pub tags: PgTagRepository,
    pub sessions: PgSessionRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            accounts: PgAccountRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            categories: PgCategoryRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with the default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with a custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Repository bundle for request and bot state.
    pub fn store(&self) -> Store {
        Store {
            accounts: Arc::new(self.accounts.clone()),
            notes: Arc::new(self.notes.clone()),
            categories: Arc::new(self.categories.clone()),
            tags: Arc::new(self.tags.clone()),
            sessions: Arc::new(self.sessions.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
