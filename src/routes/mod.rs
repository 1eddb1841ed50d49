use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;

pub mod auth;
pub mod documents;
pub mod health;
pub mod signing;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let documents_routes = Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/:id",
            get(documents::get_document).patch(documents::update_document),
        )
        .route("/:id/audit", get(documents::audit_trail))
        .route(
            "/:id/fields",
            get(documents::list_fields).put(documents::replace_fields),
        )
        .route(
            "/:id/signatories",
            get(documents::list_signatories).post(documents::add_signatories),
        )
        .route("/:id/send", post(documents::send_signing_requests))
        .route(
            "/:id/signatories/:signatory_id/remind",
            post(documents::remind_signatory),
        )
        .route("/:id/views", post(documents::record_view));

    // Token-authorized signer surface; no login involved.
    let signing_routes = Router::new().route(
        "/sign/:id/:token",
        get(signing::signing_page).post(signing::submit_signature),
    );

    Router::new()
        .merge(signing_routes)
        .nest("/api/documents", documents_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
}
