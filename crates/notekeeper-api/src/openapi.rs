//! OpenAPI document for the REST API, served at `/api-docs/openapi.json`
//! with Swagger UI at `/swagger`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use notekeeper_core::{Account, Category, LabelInput, Note, NoteInput, Tag};

use crate::handlers::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Notekeeper API",
        description = "Personal notes with categories, tags, and deadlines"
    ),
    paths(
        api::me,
        api::list_notes,
        api::create_note,
        api::get_note,
        api::update_note,
        api::delete_note,
        api::list_categories,
        api::create_category,
        api::get_category,
        api::rename_category,
        api::delete_category,
        api::list_tags,
        api::create_tag,
        api::get_tag,
        api::rename_tag,
        api::delete_tag,
    ),
    components(schemas(Account, Note, NoteInput, Category, Tag, LabelInput)),
    modifiers(&SessionAuth),
    tags(
        (name = "Account", description = "The authenticated account"),
        (name = "Notes", description = "Note CRUD and search"),
        (name = "Categories", description = "Category management"),
        (name = "Tags", description = "Tag management")
    )
)]
pub struct ApiDoc;

/// Registers the Bearer session-token scheme referenced by every path.
struct SessionAuth;

impl Modify for SessionAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_rest_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/notes"));
        assert!(paths.contains_key("/api/notes/{id}"));
        assert!(paths.contains_key("/api/categories/{id}"));
        assert!(paths.contains_key("/api/tags"));
        assert!(paths.contains_key("/api/me"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
