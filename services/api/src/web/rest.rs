//! services/api/src/web/rest.rs
//!
//! Contains the service-level REST handlers (health, public config) and the
//! master definition for the OpenAPI specification.

use crate::web::{auth, history, jobs, preview, state::AppState};
use axum::{extract::State, response::Json};
use lecture_agent_core::domain::ArtifactKind;
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        jobs::upload_handler,
        jobs::run_handler,
        jobs::reset_handler,
        preview::download_handler,
        preview::summary_preview_handler,
        preview::flashcards_preview_handler,
        preview::formulas_preview_handler,
        preview::flashcards_json_handler,
        history::list_history_handler,
        history::clear_history_handler,
        health_handler,
        config_handler,
    ),
    components(
        schemas(
            auth::AuthResponse,
            jobs::UploadResponse,
            jobs::RunResponse,
            preview::FlashcardsResponse,
            history::HistoryResponse,
            HealthResponse,
            PublicConfig
        )
    ),
    tags(
        (name = "Lecture Agent API", description = "Upload lecture documents, run the summarization agent, and browse its output.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    /// Whether a database is connected.
    pub database: bool,
}

/// Settings the browser client needs to know.
#[derive(Serialize, ToSchema)]
pub struct PublicConfig {
    pub max_files: usize,
    pub artifacts: Vec<String>,
    pub auth_enabled: bool,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        database: state.db.is_some(),
    })
}

/// Public configuration for the browser client.
#[utoipa::path(
    get,
    path = "/api/config",
    responses((status = 200, description = "Public configuration", body = PublicConfig))
)]
pub async fn config_handler(State(state): State<Arc<AppState>>) -> Json<PublicConfig> {
    Json(PublicConfig {
        max_files: jobs::MAX_FILES,
        artifacts: ArtifactKind::ALL
            .iter()
            .map(|kind| kind.file_name().to_string())
            .collect(),
        auth_enabled: state.db.is_some(),
    })
}
