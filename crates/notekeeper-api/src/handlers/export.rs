//! Plain-text export of all of an account's notes.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::FixedOffset;
use tracing::info;

use notekeeper_core::temporal::format_datetime;
use notekeeper_core::{ListNotesRequest, Note};

use crate::handlers::page_error;
use crate::session::WebAccount;
use crate::AppState;

/// Render notes in export order. No notes renders an empty string.
pub fn render_export(notes: &[Note], offset: FixedOffset) -> String {
    let mut out = String::new();
    for note in notes {
        out.push_str(&format!("=== {} ===\n", note.title));
        out.push_str(&format!(
            "Created: {}\n",
            format_datetime(note.created_at, offset)
        ));
        if let Some(category) = &note.category {
            out.push_str(&format!("Category: {}\n", category.name));
        }
        if !note.tags.is_empty() {
            out.push_str(&format!("Tags: {}\n", note.tag_names()));
        }
        out.push('\n');
        out.push_str(&note.content);
        out.push_str("\n\n");
    }
    out
}

pub async fn export_notes(
    State(state): State<AppState>,
    WebAccount(account): WebAccount,
) -> Result<Response, Response> {
    let notes = state
        .store
        .notes
        .list(account.id, ListNotesRequest::default())
        .await
        .map_err(|e| page_error(e, Some(&account)))?;

    info!(
        subsystem = "api",
        component = "export",
        account_id = account.id,
        result_count = notes.len(),
        "Notes exported"
    );
    let body = render_export(&notes, state.settings.display_offset);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"notes_export.txt\"",
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use notekeeper_core::temporal::offset_from_hours;
    use notekeeper_core::{Category, Tag};

    #[test]
    fn test_render_export_empty() {
        assert_eq!(render_export(&[], offset_from_hours(3)), "");
    }

    #[test]
    fn test_render_export_layout() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 10, 7, 5, 0).unwrap();
        let plain = Note {
            id: 1,
            title: "Plain".to_string(),
            content: "body".to_string(),
            created_at: ts,
            updated_at: ts,
            deadline: None,
            category: None,
            tags: vec![],
        };
        let labelled = Note {
            id: 2,
            title: "Shopping".to_string(),
            content: "milk".to_string(),
            category: Some(Category {
                id: 1,
                name: "Home".to_string(),
            }),
            tags: vec![
                Tag {
                    id: 1,
                    name: "a".to_string(),
                },
                Tag {
                    id: 2,
                    name: "b".to_string(),
                },
            ],
            ..plain.clone()
        };

        let text = render_export(&[labelled, plain], offset_from_hours(3));
        assert_eq!(
            text,
            "=== Shopping ===\nCreated: 2026-02-10 10:05\nCategory: Home\nTags: a, b\n\nmilk\n\n\
             === Plain ===\nCreated: 2026-02-10 10:05\n\nbody\n\n"
        );
    }
}
