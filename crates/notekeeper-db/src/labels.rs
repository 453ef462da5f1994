//! Category and tag repositories.
//!
//! Both are per-account name lists with case-insensitive unique names, so they
//! share one table-parameterized implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use notekeeper_core::validation::normalize_label;
use notekeeper_core::{
    AccountId, Category, CategoryRepository, Error, Result, Tag, TagRepository,
};

use crate::map_write_error;

#[derive(Clone)]
struct PgLabels {
    pool: Pool<Postgres>,
    table: &'static str,
}

impl PgLabels {
    async fn create(&self, owner: AccountId, name: &str) -> Result<(i64, String)> {
        let name = normalize_label(name)?;
        let sql = format!(
            "INSERT INTO {} (owner_id, name) VALUES ($1, $2) RETURNING id, name",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(owner)
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, || format!("{} {} already exists", self.table, name)))?;
        Ok((row.get("id"), row.get("name")))
    }

    async fn get(&self, owner: AccountId, id: i64) -> Result<(i64, String)> {
        let sql = format!(
            "SELECT id, name FROM {} WHERE id = $1 AND owner_id = $2",
            self.table
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .map(|row| (row.get("id"), row.get("name")))
            .ok_or_else(|| Error::not_found(self.table, id))
    }

    async fn list(&self, owner: AccountId) -> Result<Vec<(i64, String)>> {
        let sql = format!(
            "SELECT id, name FROM {} WHERE owner_id = $1 ORDER BY lower(name), id",
            self.table
        );
        let rows = sqlx::query(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows
            .iter()
            .map(|row| (row.get("id"), row.get("name")))
            .collect())
    }

    async fn rename(&self, owner: AccountId, id: i64, name: &str) -> Result<(i64, String)> {
        let name = normalize_label(name)?;
        let sql = format!(
            "UPDATE {} SET name = $3 WHERE id = $1 AND owner_id = $2 RETURNING id, name",
            self.table
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .bind(&name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, || format!("{} {} already exists", self.table, name)))?
            .map(|row| (row.get("id"), row.get("name")))
            .ok_or_else(|| Error::not_found(self.table, id))
    }

    async fn delete(&self, owner: AccountId, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1 AND owner_id = $2", self.table);
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(self.table, id));
        }
        Ok(())
    }

    async fn get_or_create(&self, owner: AccountId, name: &str) -> Result<(i64, String)> {
        let name = normalize_label(name)?;
        let sql = format!(
            r#"INSERT INTO {table} (owner_id, name) VALUES ($1, $2)
               ON CONFLICT (owner_id, (lower(name))) DO UPDATE SET name = {table}.name
               RETURNING id, name"#,
            table = self.table
        );
        let row = sqlx::query(&sql)
            .bind(owner)
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok((row.get("id"), row.get("name")))
    }
}

fn category((id, name): (i64, String)) -> Category {
    Category { id, name }
}

fn tag((id, name): (i64, String)) -> Tag {
    Tag { id, name }
}

/// PostgreSQL implementation of CategoryRepository.
#[derive(Clone)]
pub struct PgCategoryRepository {
    labels: PgLabels,
}

impl PgCategoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            labels: PgLabels {
                pool,
                table: "category",
            },
        }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create(&self, owner: AccountId, name: &str) -> Result<Category> {
        self.labels.create(owner, name).await.map(category)
    }

    async fn get(&self, owner: AccountId, id: i64) -> Result<Category> {
        self.labels.get(owner, id).await.map(category)
    }

    async fn list(&self, owner: AccountId) -> Result<Vec<Category>> {
        Ok(self.labels.list(owner).await?.into_iter().map(category).collect())
    }

    async fn rename(&self, owner: AccountId, id: i64, name: &str) -> Result<Category> {
        self.labels.rename(owner, id, name).await.map(category)
    }

    async fn delete(&self, owner: AccountId, id: i64) -> Result<()> {
        self.labels.delete(owner, id).await
    }

    async fn get_or_create(&self, owner: AccountId, name: &str) -> Result<Category> {
        self.labels.get_or_create(owner, name).await.map(category)
    }
}

/// PostgreSQL implementation of TagRepository.
#[derive(Clone)]
pub struct PgTagRepository {
    labels: PgLabels,
}

impl PgTagRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            labels: PgLabels { pool, table: "tag" },
        }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn create(&self, owner: AccountId, name: &str) -> Result<Tag> {
        self.labels.create(owner, name).await.map(tag)
    }

    async fn get(&self, owner: AccountId, id: i64) -> Result<Tag> {
        self.labels.get(owner, id).await.map(tag)
    }

    async fn list(&self, owner: AccountId) -> Result<Vec<Tag>> {
        Ok(self.labels.list(owner).await?.into_iter().map(tag).collect())
    }

    async fn rename(&self, owner: AccountId, id: i64, name: &str) -> Result<Tag> {
        self.labels.rename(owner, id, name).await.map(tag)
    }

    async fn delete(&self, owner: AccountId, id: i64) -> Result<()> {
        self.labels.delete(owner, id).await
    }

    async fn get_or_create(&self, owner: AccountId, name: &str) -> Result<Tag> {
        self.labels.get_or_create(owner, name).await.map(tag)
    }
}
