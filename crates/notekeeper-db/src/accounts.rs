//! Account repository and chat-identity reconciliation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::info;

use notekeeper_core::{
    Account, AccountCredentials, AccountId, AccountRepository, Error, ExternalProfile, NewAccount,
    Reconciled, Result,
};

use crate::map_write_error;

const ACCOUNT_COLUMNS: &str = "id, username, telegram_id, telegram_username, first_name, \
     last_name, is_active, (password_hash IS NOT NULL) AS has_password, created_at";

pub(crate) fn account_from_row(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        username: row.get("username"),
        telegram_id: row.get("telegram_id"),
        telegram_username: row.get("telegram_username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        is_active: row.get("is_active"),
        has_password: row.get("has_password"),
        created_at: row.get("created_at"),
    }
}

/// PostgreSQL implementation of AccountRepository.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: Pool<Postgres>,
}

impl PgAccountRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create_with_password(&self, req: NewAccount) -> Result<Account> {
        let sql = format!(
            "INSERT INTO account (username, password_hash) VALUES ($1, $2) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&req.username)
            .bind(&req.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, || format!("username {} is taken", req.username)))?;

        let account = account_from_row(&row);
        info!(
            subsystem = "db",
            component = "accounts",
            op = "register",
            account_id = account.id,
            "Password account created"
        );
        Ok(account)
    }

    async fn get(&self, id: AccountId) -> Result<Account> {
        let sql = format!("SELECT {} FROM account WHERE id = $1", ACCOUNT_COLUMNS);
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .map(|row| account_from_row(&row))
            .ok_or_else(|| Error::not_found("account", id))
    }

    async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM account WHERE telegram_id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| account_from_row(&r)))
    }

    async fn credentials(&self, username: &str) -> Result<Option<AccountCredentials>> {
        let sql = format!(
            "SELECT {}, password_hash FROM account WHERE username = $1",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| AccountCredentials {
            account: account_from_row(&r),
            password_hash: r.get("password_hash"),
        }))
    }

    async fn reconcile_external(&self, profile: &ExternalProfile) -> Result<Reconciled> {
        // The no-op DO UPDATE makes RETURNING yield the existing row on conflict.
        // xmax is 0 only for a row inserted by this statement.
        let sql = format!(
            r#"INSERT INTO account (username, telegram_id, telegram_username, first_name, last_name)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id
               RETURNING {}, (xmax = 0) AS created"#,
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(profile.placeholder_username())
            .bind(profile.telegram_id)
            .bind(&profile.username)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                map_write_error(e, || {
                    format!("username {} is taken", profile.placeholder_username())
                })
            })?;

        let account = account_from_row(&row);
        let created: bool = row.get("created");
        info!(
            subsystem = "db",
            component = "reconciler",
            op = "reconcile",
            account_id = account.id,
            telegram_id = profile.telegram_id,
            created,
            "External identity reconciled"
        );
        Ok(Reconciled { account, created })
    }
}
