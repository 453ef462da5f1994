//! JSON REST API over the caller's notes, categories, and tags.
//!
//! Every route requires a session (cookie or Bearer token) and only ever
//! touches rows owned by the caller. Someone else's id is a 404.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::debug;
use utoipa::IntoParams;

use notekeeper_core::defaults::{PAGE_LIMIT, PAGE_LIMIT_MAX};
use notekeeper_core::{Account, Category, LabelInput, ListNotesRequest, Note, NoteInput, Tag};

use crate::session::CurrentAccount;
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListNotesQuery {
    /// Page size (default 50, max 500)
    pub limit: Option<i64>,
    /// Number of notes to skip
    pub offset: Option<i64>,
    /// Case-insensitive substring filter over title, content, and tag names
    pub q: Option<String>,
}

impl ListNotesQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(PAGE_LIMIT).clamp(1, PAGE_LIMIT_MAX)
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

// =============================================================================
// ACCOUNT
// =============================================================================

#[utoipa::path(get, path = "/api/me", tag = "Account",
    responses(
        (status = 200, description = "Authenticated account", body = Account),
        (status = 401, description = "No valid session"),
    ),
    security(("bearer" = []))
)]
pub async fn me(CurrentAccount(account): CurrentAccount) -> Json<Account> {
    Json(account)
}

// =============================================================================
// NOTES
// =============================================================================

#[utoipa::path(get, path = "/api/notes", tag = "Notes",
    params(ListNotesQuery),
    responses((status = 200, description = "Notes, newest first", body = [Note])),
    security(("bearer" = []))
)]
pub async fn list_notes(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => state.store.notes.search(account.id, q, query.limit()).await?,
        None => {
            state
                .store
                .notes
                .list(
                    account.id,
                    ListNotesRequest {
                        limit: Some(query.limit()),
                        offset: Some(query.offset()),
                    },
                )
                .await?
        }
    };
    debug!(
        subsystem = "api",
        component = "rest",
        op = "list_notes",
        account_id = account.id,
        result_count = notes.len(),
        "Listed notes"
    );
    Ok(Json(notes))
}

#[utoipa::path(post, path = "/api/notes", tag = "Notes",
    request_body = NoteInput,
    responses(
        (status = 201, description = "Created", body = Note),
        (status = 400, description = "Invalid input or foreign label id"),
    ),
    security(("bearer" = []))
)]
pub async fn create_note(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Json(input): Json<NoteInput>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.store.notes.create(account.id, input).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(get, path = "/api/notes/{id}", tag = "Notes",
    params(("id" = i64, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note", body = Note),
        (status = 404, description = "Not found"),
    ),
    security(("bearer" = []))
)]
pub async fn get_note(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<i64>,
) -> Result<Json<Note>, ApiError> {
    Ok(Json(state.store.notes.get(account.id, id).await?))
}

#[utoipa::path(put, path = "/api/notes/{id}", tag = "Notes",
    params(("id" = i64, Path, description = "Note id")),
    request_body = NoteInput,
    responses(
        (status = 200, description = "Updated", body = Note),
        (status = 404, description = "Not found"),
    ),
    security(("bearer" = []))
)]
pub async fn update_note(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<i64>,
    Json(input): Json<NoteInput>,
) -> Result<Json<Note>, ApiError> {
    Ok(Json(state.store.notes.update(account.id, id, input).await?))
}

#[utoipa::path(delete, path = "/api/notes/{id}", tag = "Notes",
    params(("id" = i64, Path, description = "Note id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer" = []))
)]
pub async fn delete_note(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.notes.delete(account.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// CATEGORIES
// =============================================================================

#[utoipa::path(get, path = "/api/categories", tag = "Categories",
    responses((status = 200, description = "Categories sorted by name", body = [Category])),
    security(("bearer" = []))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.store.categories.list(account.id).await?))
}

#[utoipa::path(post, path = "/api/categories", tag = "Categories",
    request_body = LabelInput,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 409, description = "Name already used"),
    ),
    security(("bearer" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Json(input): Json<LabelInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.store.categories.create(account.id, &input.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(get, path = "/api/categories/{id}", tag = "Categories",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Not found"),
    ),
    security(("bearer" = []))
)]
pub async fn get_category(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.store.categories.get(account.id, id).await?))
}

#[utoipa::path(put, path = "/api/categories/{id}", tag = "Categories",
    params(("id" = i64, Path, description = "Category id")),
    request_body = LabelInput,
    responses(
        (status = 200, description = "Renamed", body = Category),
        (status = 404, description = "Not found"),
        (status = 409, description = "Name already used"),
    ),
    security(("bearer" = []))
)]
pub async fn rename_category(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<i64>,
    Json(input): Json<LabelInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(
        state
            .store
            .categories
            .rename(account.id, id, &input.name)
            .await?,
    ))
}

#[utoipa::path(delete, path = "/api/categories/{id}", tag = "Categories",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 204, description = "Deleted; notes keep existing without a category"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.categories.delete(account.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// TAGS
// =============================================================================

#[utoipa::path(get, path = "/api/tags", tag = "Tags",
    responses((status = 200, description = "Tags sorted by name", body = [Tag])),
    security(("bearer" = []))
)]
pub async fn list_tags(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.store.tags.list(account.id).await?))
}

#[utoipa::path(post, path = "/api/tags", tag = "Tags",
    request_body = LabelInput,
    responses(
        (status = 201, description = "Created", body = Tag),
        (status = 409, description = "Name already used"),
    ),
    security(("bearer" = []))
)]
pub async fn create_tag(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Json(input): Json<LabelInput>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.store.tags.create(account.id, &input.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

#[utoipa::path(get, path = "/api/tags/{id}", tag = "Tags",
    params(("id" = i64, Path, description = "Tag id")),
    responses(
        (status = 200, description = "Tag", body = Tag),
        (status = 404, description = "Not found"),
    ),
    security(("bearer" = []))
)]
pub async fn get_tag(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<i64>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.store.tags.get(account.id, id).await?))
}

#[utoipa::path(put, path = "/api/tags/{id}", tag = "Tags",
    params(("id" = i64, Path, description = "Tag id")),
    request_body = LabelInput,
    responses(
        (status = 200, description = "Renamed", body = Tag),
        (status = 404, description = "Not found"),
        (status = 409, description = "Name already used"),
    ),
    security(("bearer" = []))
)]
pub async fn rename_tag(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<i64>,
    Json(input): Json<LabelInput>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(
        state.store.tags.rename(account.id, id, &input.name).await?,
    ))
}

#[utoipa::path(delete, path = "/api/tags/{id}", tag = "Tags",
    params(("id" = i64, Path, description = "Tag id")),
    responses(
        (status = 204, description = "Deleted and detached from notes"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer" = []))
)]
pub async fn delete_tag(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.tags.delete(account.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        let q = ListNotesQuery::default();
        assert_eq!(q.limit(), PAGE_LIMIT);
        assert_eq!(q.offset(), 0);

        let q = ListNotesQuery {
            limit: Some(10_000),
            offset: Some(-4),
            q: None,
        };
        assert_eq!(q.limit(), PAGE_LIMIT_MAX);
        assert_eq!(q.offset(), 0);

        let q = ListNotesQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(q.limit(), 1);
    }
}
