pub mod auth;
pub mod history;
pub mod jobs;
pub mod middleware;
pub mod preview;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::{optional_auth, require_auth};
pub use rest::ApiDoc;
pub use state::AppState;

/// Builds the complete application router: API routes, CORS, and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    let cors = match app_state.config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin).allow_credentials(true),
        Err(_) => {
            warn!(
                "Ignoring invalid CORS_ORIGIN '{}'",
                app_state.config.cors_origin
            );
            cors
        }
    };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/download/{name}", get(preview::download_handler))
        .route("/api/summary-preview", get(preview::summary_preview_handler))
        .route("/api/flashcards-preview", get(preview::flashcards_preview_handler))
        .route("/api/formulas-preview", get(preview::formulas_preview_handler))
        .route("/api/flashcards-json", get(preview::flashcards_json_handler))
        .route("/api/reset", post(jobs::reset_handler))
        .route("/api/health", get(rest::health_handler))
        .route("/api/config", get(rest::config_handler));

    // Routes that record history when the caller happens to be logged in
    let optional_auth_routes = Router::new()
        .route("/api/upload", post(jobs::upload_handler))
        .route("/api/run", post(jobs::run_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            optional_auth,
        ));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/me", get(auth::me_handler))
        .route(
            "/api/history",
            get(history::list_history_handler).delete(history::clear_history_handler),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(optional_auth_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
