//! Note repository implementation.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;

use notekeeper_core::validation::validate_note_input;
use notekeeper_core::{
    AccountId, Category, Error, ListNotesRequest, Note, NoteInput, NoteRepository, Result, Tag,
};

use crate::escape_like;

const NOTE_SELECT: &str = r#"SELECT n.id, n.title, n.content, n.created_at, n.updated_at,
           n.deadline, c.id AS category_id, c.name AS category_name
      FROM note n
      LEFT JOIN category c ON c.id = n.category_id"#;

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn note_from_row(row: &PgRow) -> Note {
        let category_id: Option<i64> = row.get("category_id");
        let category_name: Option<String> = row.get("category_name");
        Note {
            id: row.get("id"),
            title: row.get("title"),
            content: row.get("content"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            deadline: row.get("deadline"),
            category: category_id
                .zip(category_name)
                .map(|(id, name)| Category { id, name }),
            tags: Vec::new(),
        }
    }

    /// Attach tags to already loaded notes with one query.
    async fn with_tags(&self, mut notes: Vec<Note>) -> Result<Vec<Note>> {
        if notes.is_empty() {
            return Ok(notes);
        }
        let ids: Vec<i64> = notes.iter().map(|n| n.id).collect();
        let rows = sqlx::query(
            r#"SELECT nt.note_id, t.id, t.name
                 FROM note_tag nt
                 JOIN tag t ON t.id = nt.tag_id
                WHERE nt.note_id = ANY($1)
                ORDER BY lower(t.name), t.id"#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut by_note: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in rows {
            by_note.entry(row.get("note_id")).or_default().push(Tag {
                id: row.get("id"),
                name: row.get("name"),
            });
        }
        for note in &mut notes {
            note.tags = by_note.remove(&note.id).unwrap_or_default();
        }
        Ok(notes)
    }

    /// Reject category and tag ids that the owner does not have.
    async fn check_labels_tx(
        tx: &mut Transaction<'_, Postgres>,
        owner: AccountId,
        input: &NoteInput,
    ) -> Result<Vec<i64>> {
        if let Some(category_id) = input.category_id {
            let found = sqlx::query("SELECT 1 FROM category WHERE id = $1 AND owner_id = $2")
                .bind(category_id)
                .bind(owner)
                .fetch_optional(&mut **tx)
                .await
                .map_err(Error::Database)?;
            if found.is_none() {
                return Err(Error::InvalidInput(format!(
                    "unknown category: {}",
                    category_id
                )));
            }
        }

        let mut tag_ids = input.tag_ids.clone();
        tag_ids.sort_unstable();
        tag_ids.dedup();
        if !tag_ids.is_empty() {
            let owned: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM tag WHERE owner_id = $1 AND id = ANY($2)")
                    .bind(owner)
                    .bind(&tag_ids)
                    .fetch_one(&mut **tx)
                    .await
                    .map_err(Error::Database)?;
            if owned != tag_ids.len() as i64 {
                return Err(Error::InvalidInput("unknown tag in tag_ids".to_string()));
            }
        }
        Ok(tag_ids)
    }

    async fn replace_tags_tx(
        tx: &mut Transaction<'_, Postgres>,
        note_id: i64,
        tag_ids: &[i64],
    ) -> Result<()> {
        sqlx::query("DELETE FROM note_tag WHERE note_id = $1")
            .bind(note_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        if !tag_ids.is_empty() {
            sqlx::query("INSERT INTO note_tag (note_id, tag_id) SELECT $1, unnest($2::bigint[])")
                .bind(note_id)
                .bind(tag_ids)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn create(&self, owner: AccountId, input: NoteInput) -> Result<Note> {
        validate_note_input(&input)?;
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let tag_ids = Self::check_labels_tx(&mut tx, owner, &input).await?;

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO note (owner_id, title, content, deadline, category_id)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(owner)
        .bind(input.title.trim())
        .bind(&input.content)
        .bind(input.deadline)
        .bind(input.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        Self::replace_tags_tx(&mut tx, id, &tag_ids).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "notes",
            op = "create",
            account_id = owner,
            note_id = id,
            "Note created"
        );
        NoteRepository::get(self, owner, id).await
    }

    async fn get(&self, owner: AccountId, id: i64) -> Result<Note> {
        let sql = format!("{} WHERE n.id = $1 AND n.owner_id = $2", NOTE_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::not_found("note", id))?;
        let mut notes = self.with_tags(vec![Self::note_from_row(&row)]).await?;
        notes.pop().ok_or_else(|| Error::not_found("note", id))
    }

    async fn list(&self, owner: AccountId, req: ListNotesRequest) -> Result<Vec<Note>> {
        let sql = format!(
            "{} WHERE n.owner_id = $1 ORDER BY n.created_at DESC, n.id DESC LIMIT $2 OFFSET $3",
            NOTE_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(owner)
            .bind(req.limit)
            .bind(req.offset.unwrap_or(0))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        self.with_tags(rows.iter().map(Self::note_from_row).collect())
            .await
    }

    async fn search(&self, owner: AccountId, query: &str, limit: i64) -> Result<Vec<Note>> {
        let start = Instant::now();
        let pattern = format!("%{}%", escape_like(query.trim()));
        let sql = format!(
            r#"{} WHERE n.owner_id = $1
                  AND (n.title ILIKE $2 ESCAPE '\'
                       OR n.content ILIKE $2 ESCAPE '\'
                       OR EXISTS (SELECT 1 FROM note_tag nt
                                    JOIN tag t ON t.id = nt.tag_id
                                   WHERE nt.note_id = n.id
                                     AND t.name ILIKE $2 ESCAPE '\'))
                ORDER BY n.created_at DESC, n.id DESC
                LIMIT $3"#,
            NOTE_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(owner)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let notes = self
            .with_tags(rows.iter().map(Self::note_from_row).collect())
            .await?;
        debug!(
            subsystem = "db",
            component = "notes",
            op = "search",
            account_id = owner,
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Note search complete"
        );
        Ok(notes)
    }

    async fn update(&self, owner: AccountId, id: i64, input: NoteInput) -> Result<Note> {
        validate_note_input(&input)?;
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let exists = sqlx::query("SELECT 1 FROM note WHERE id = $1 AND owner_id = $2 FOR UPDATE")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if exists.is_none() {
            return Err(Error::not_found("note", id));
        }

        let tag_ids = Self::check_labels_tx(&mut tx, owner, &input).await?;
        sqlx::query(
            r#"UPDATE note
                  SET title = $3, content = $4, deadline = $5, category_id = $6, updated_at = now()
                WHERE id = $1 AND owner_id = $2"#,
        )
        .bind(id)
        .bind(owner)
        .bind(input.title.trim())
        .bind(&input.content)
        .bind(input.deadline)
        .bind(input.category_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        Self::replace_tags_tx(&mut tx, id, &tag_ids).await?;
        tx.commit().await.map_err(Error::Database)?;
        NoteRepository::get(self, owner, id).await
    }

    async fn set_deadline(
        &self,
        owner: AccountId,
        id: i64,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Note> {
        let result = sqlx::query(
            "UPDATE note SET deadline = $3, updated_at = now() WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner)
        .bind(deadline)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("note", id));
        }
        NoteRepository::get(self, owner, id).await
    }

    async fn delete(&self, owner: AccountId, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("note", id));
        }
        debug!(
            subsystem = "db",
            component = "notes",
            op = "delete",
            account_id = owner,
            note_id = id,
            "Note deleted"
        );
        Ok(())
    }
}
