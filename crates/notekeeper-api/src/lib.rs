//! # notekeeper-api
//!
//! Web interface, REST API, and chat-identity login for notekeeper.
//!
//! [`router`] builds the complete axum application over an [`AppState`];
//! the binary in `main.rs` wires it to PostgreSQL, while tests drive it
//! in-process against the in-memory store.

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod session;
pub mod state;
pub mod views;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub use error::ApiError;
pub use state::{AppState, GlobalRateLimiter};

use handlers::{accounts, api, export, notes, telegram};

/// Forms and JSON bodies are small; 1 MiB is plenty.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Request ID generator using UUIDv7 (time-ordered).
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Rate limit for the login and registration endpoints.
async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if let Some(limiter) = &state.auth_limiter {
        if limiter.check().is_err() {
            tracing::warn!(
                subsystem = "api",
                component = "rate_limit",
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "error_description": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn cors_layer(webapp_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));
    match HeaderValue::from_str(webapp_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin).allow_credentials(true),
        Err(_) => layer,
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    // Endpoints that accept credentials or identity proofs
    let auth_routes = Router::new()
        .route(
            "/accounts/login/",
            get(accounts::login_form).post(accounts::login),
        )
        .route(
            "/accounts/register/",
            get(accounts::register_form).post(accounts::register),
        )
        .route("/auth/telegram/widget/", axum::routing::post(telegram::widget_callback))
        .route("/auth/telegram/complete/", get(telegram::complete))
        .route("/auth/telegram/link", get(telegram::link_login))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let web_routes = Router::new()
        .route("/", get(notes::note_list))
        .route(
            "/notes/new/",
            get(notes::new_note_form).post(notes::create_note),
        )
        .route("/notes/export/", get(export::export_notes))
        .route("/notes/:id/", get(notes::note_detail))
        .route(
            "/notes/:id/edit/",
            get(notes::edit_note_form).post(notes::update_note),
        )
        .route(
            "/notes/:id/delete/",
            get(notes::confirm_delete).post(notes::delete_note),
        )
        .route(
            "/accounts/logout/",
            get(accounts::logout).post(accounts::logout),
        )
        .route("/auth/telegram/", get(telegram::login_page));

    let api_routes = Router::new()
        .route("/api/me", get(api::me))
        .route("/api/notes", get(api::list_notes).post(api::create_note))
        .route(
            "/api/notes/:id",
            get(api::get_note)
                .put(api::update_note)
                .delete(api::delete_note),
        )
        .route(
            "/api/categories",
            get(api::list_categories).post(api::create_category),
        )
        .route(
            "/api/categories/:id",
            get(api::get_category)
                .put(api::rename_category)
                .delete(api::delete_category),
        )
        .route("/api/tags", get(api::list_tags).post(api::create_tag))
        .route(
            "/api/tags/:id",
            get(api::get_tag)
                .put(api::rename_tag)
                .delete(api::delete_tag),
        );

    let cors = cors_layer(&state.settings.webapp_url);

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(web_routes)
        .merge(api_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .with_state(state)
}
