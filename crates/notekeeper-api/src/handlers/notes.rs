//! HTML note pages.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use tracing::info;

use notekeeper_core::temporal::{local_midnight, parse_date, today};
use notekeeper_core::validation::{
    normalize_label, parse_label_list, validate_deadline, validate_note_input,
};
use notekeeper_core::{Account, Error, ListNotesRequest, NoteInput, Result};

use crate::handlers::page_error;
use crate::session::WebAccount;
use crate::views::{self, NoteFormValues};
use crate::AppState;

type PageResult = std::result::Result<Response, Response>;

/// Turn raw form values into a note write, creating labels on demand.
///
/// Everything that can be checked without storage is checked before any
/// category or tag is created.
async fn note_input_from_form(
    state: &AppState,
    account: &Account,
    form: &NoteFormValues,
) -> Result<NoteInput> {
    let mut input = NoteInput::text(form.title.trim(), form.content.clone());
    validate_note_input(&input)?;

    let deadline = form.deadline.trim();
    if !deadline.is_empty() {
        let offset = state.settings.display_offset;
        let date = parse_date(deadline)
            .map_err(|_| Error::InvalidInput("Неверный формат даты.".to_string()))?;
        validate_deadline(date, today(Utc::now(), offset))?;
        input.deadline = Some(local_midnight(date, offset));
    }

    let category = form.category.trim();
    let category = if category.is_empty() {
        None
    } else {
        Some(normalize_label(category)?)
    };
    let tag_names = parse_label_list(&form.tags)?;

    if let Some(name) = category {
        let category = state
            .store
            .categories
            .get_or_create(account.id, &name)
            .await?;
        input.category_id = Some(category.id);
    }
    for name in tag_names {
        let tag = state.store.tags.get_or_create(account.id, &name).await?;
        input.tag_ids.push(tag.id);
    }
    Ok(input)
}

/// Re-render the form on validation errors; other errors become error pages.
fn form_error(
    err: Error,
    account: &Account,
    heading: &str,
    action: &str,
    values: &NoteFormValues,
) -> Response {
    match err {
        Error::InvalidInput(msg) => (
            StatusCode::BAD_REQUEST,
            Html(views::note_form(account, heading, action, values, Some(&msg))),
        )
            .into_response(),
        other => page_error(other, Some(account)),
    }
}

pub async fn note_list(
    State(state): State<AppState>,
    WebAccount(account): WebAccount,
) -> PageResult {
    let store = &state.store;
    let notes = store
        .notes
        .list(account.id, ListNotesRequest::default())
        .await
        .map_err(|e| page_error(e, Some(&account)))?;
    let categories = store
        .categories
        .list(account.id)
        .await
        .map_err(|e| page_error(e, Some(&account)))?;
    let tags = store
        .tags
        .list(account.id)
        .await
        .map_err(|e| page_error(e, Some(&account)))?;
    Ok(Html(views::note_list(
        &account,
        &notes,
        &categories,
        &tags,
        state.settings.display_offset,
    ))
    .into_response())
}

pub async fn note_detail(
    State(state): State<AppState>,
    WebAccount(account): WebAccount,
    Path(id): Path<i64>,
) -> PageResult {
    let note = state
        .store
        .notes
        .get(account.id, id)
        .await
        .map_err(|e| page_error(e, Some(&account)))?;
    Ok(Html(views::note_detail(&account, &note, state.settings.display_offset)).into_response())
}

pub async fn new_note_form(WebAccount(account): WebAccount) -> Html<String> {
    Html(views::note_form(
        &account,
        "Новая заметка",
        "/notes/new/",
        &NoteFormValues::default(),
        None,
    ))
}

pub async fn create_note(
    State(state): State<AppState>,
    WebAccount(account): WebAccount,
    Form(form): Form<NoteFormValues>,
) -> PageResult {
    let heading = "Новая заметка";
    let action = "/notes/new/";
    let input = note_input_from_form(&state, &account, &form)
        .await
        .map_err(|e| form_error(e, &account, heading, action, &form))?;
    let note = state
        .store
        .notes
        .create(account.id, input)
        .await
        .map_err(|e| form_error(e, &account, heading, action, &form))?;

    info!(
        subsystem = "api",
        component = "notes",
        op = "create",
        account_id = account.id,
        note_id = note.id,
        "Note created from web form"
    );
    Ok(Redirect::to(&format!("/notes/{}/", note.id)).into_response())
}

pub async fn edit_note_form(
    State(state): State<AppState>,
    WebAccount(account): WebAccount,
    Path(id): Path<i64>,
) -> PageResult {
    let note = state
        .store
        .notes
        .get(account.id, id)
        .await
        .map_err(|e| page_error(e, Some(&account)))?;
    let values = NoteFormValues::from_note(&note, state.settings.display_offset);
    Ok(Html(views::note_form(
        &account,
        "Редактирование заметки",
        &format!("/notes/{}/edit/", id),
        &values,
        None,
    ))
    .into_response())
}

pub async fn update_note(
    State(state): State<AppState>,
    WebAccount(account): WebAccount,
    Path(id): Path<i64>,
    Form(form): Form<NoteFormValues>,
) -> PageResult {
    let heading = "Редактирование заметки";
    let action = format!("/notes/{}/edit/", id);

    // 404 before any label gets created for a note the caller cannot edit
    state
        .store
        .notes
        .get(account.id, id)
        .await
        .map_err(|e| page_error(e, Some(&account)))?;

    let input = note_input_from_form(&state, &account, &form)
        .await
        .map_err(|e| form_error(e, &account, heading, &action, &form))?;
    state
        .store
        .notes
        .update(account.id, id, input)
        .await
        .map_err(|e| form_error(e, &account, heading, &action, &form))?;
    Ok(Redirect::to(&format!("/notes/{}/", id)).into_response())
}

pub async fn confirm_delete(
    State(state): State<AppState>,
    WebAccount(account): WebAccount,
    Path(id): Path<i64>,
) -> PageResult {
    let note = state
        .store
        .notes
        .get(account.id, id)
        .await
        .map_err(|e| page_error(e, Some(&account)))?;
    Ok(Html(views::confirm_delete(&account, &note)).into_response())
}

pub async fn delete_note(
    State(state): State<AppState>,
    WebAccount(account): WebAccount,
    Path(id): Path<i64>,
) -> PageResult {
    state
        .store
        .notes
        .delete(account.id, id)
        .await
        .map_err(|e| page_error(e, Some(&account)))?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "delete",
        account_id = account.id,
        note_id = id,
        "Note deleted from web"
    );
    Ok(Redirect::to("/").into_response())
}
