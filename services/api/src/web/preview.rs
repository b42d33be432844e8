//! services/api/src/web/preview.rs
//!
//! Serving generated artifacts: raw downloads and text previews extracted from
//! the `.docx` packages.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use lecture_agent_core::{
    domain::{ArtifactKind, Flashcard},
    preview::{filter_runs, pair_flashcards, render_paragraphs},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tokio_util::io::ReaderStream;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::ApiError,
    web::{jobs::JobQuery, state::AppState},
};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

static ARTIFACT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+\.docx$").unwrap());

/// Accepts only plain `.docx` file names, which also rules out path traversal.
pub fn validate_artifact_name(name: &str) -> Result<&str, ApiError> {
    if ARTIFACT_NAME.is_match(name) {
        Ok(name)
    } else {
        Err(ApiError::BadRequest(format!("Invalid file name '{}'", name)))
    }
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    /// Job to read from; the latest upload when omitted.
    pub job: Option<Uuid>,
    /// Overrides the default artifact file name.
    pub file: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardView {
    pub question: String,
    pub answer: String,
}

impl From<Flashcard> for FlashcardView {
    fn from(card: Flashcard) -> Self {
        Self {
            question: card.question,
            answer: card.answer,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardsResponse {
    pub ok: bool,
    pub file: String,
    pub cards: Vec<FlashcardView>,
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Locates the requested artifact and returns its file name and filtered text runs.
async fn artifact_runs(
    state: &AppState,
    query: PreviewQuery,
    kind: ArtifactKind,
) -> Result<(String, Vec<String>), ApiError> {
    let name = match query.file.as_deref() {
        Some(file) => validate_artifact_name(file)?.to_string(),
        None => kind.file_name().to_string(),
    };
    let not_found = || ApiError::NotFound(format!("{} not found", name));

    let job = state.job_or_latest(query.job).await.ok_or_else(not_found)?;
    let path = state
        .workspace
        .artifact_path(job, &name)
        .await
        .ok_or_else(not_found)?;

    let runs = state.documents.read_text_runs(&path).await?;
    Ok((name, filter_runs(runs)))
}

async fn html_preview(
    state: &AppState,
    query: PreviewQuery,
    kind: ArtifactKind,
) -> Result<Html<String>, ApiError> {
    let (_, runs) = artifact_runs(state, query, kind).await?;
    Ok(Html(render_paragraphs(&runs)))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Download a generated artifact.
#[utoipa::path(
    get,
    path = "/api/download/{name}",
    params(
        ("name" = String, Path, description = "Artifact file name, e.g. summaries.docx"),
        JobQuery
    ),
    responses(
        (status = 200, description = "The document as an attachment"),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "No such artifact")
    )
)]
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<JobQuery>,
) -> Result<Response, ApiError> {
    let name = validate_artifact_name(&name)?;
    let not_found = || ApiError::NotFound(format!("{} not found", name));

    let job = state.job_or_latest(query.job).await.ok_or_else(not_found)?;
    let path = state
        .workspace
        .artifact_path(job, name)
        .await
        .ok_or_else(not_found)?;

    let file = tokio::fs::File::open(&path).await?;
    let size = file.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        body,
    )
        .into_response())
}

/// HTML preview of the summaries document.
#[utoipa::path(
    get,
    path = "/api/summary-preview",
    params(PreviewQuery),
    responses(
        (status = 200, description = "One paragraph per text run", content_type = "text/html", body = String),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "No such artifact")
    )
)]
pub async fn summary_preview_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Result<Html<String>, ApiError> {
    html_preview(&state, query, ArtifactKind::Summaries).await
}

/// HTML preview of the flashcards document.
#[utoipa::path(
    get,
    path = "/api/flashcards-preview",
    params(PreviewQuery),
    responses(
        (status = 200, description = "One paragraph per text run", content_type = "text/html", body = String),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "No such artifact")
    )
)]
pub async fn flashcards_preview_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Result<Html<String>, ApiError> {
    html_preview(&state, query, ArtifactKind::Flashcards).await
}

/// HTML preview of the formula sheet.
#[utoipa::path(
    get,
    path = "/api/formulas-preview",
    params(PreviewQuery),
    responses(
        (status = 200, description = "One paragraph per text run", content_type = "text/html", body = String),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "No such artifact")
    )
)]
pub async fn formulas_preview_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Result<Html<String>, ApiError> {
    html_preview(&state, query, ArtifactKind::FormulaSheet).await
}

/// Flashcards as structured question/answer pairs.
#[utoipa::path(
    get,
    path = "/api/flashcards-json",
    params(PreviewQuery),
    responses(
        (status = 200, description = "Reconstructed flashcards", body = FlashcardsResponse),
        (status = 400, description = "Invalid file name"),
        (status = 404, description = "No such artifact")
    )
)]
pub async fn flashcards_json_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<FlashcardsResponse>, ApiError> {
    let (file, runs) = artifact_runs(&state, query, ArtifactKind::Flashcards).await?;
    let cards = pair_flashcards(&runs)
        .into_iter()
        .map(FlashcardView::from)
        .collect();
    Ok(Json(FlashcardsResponse {
        ok: true,
        file,
        cards,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names_must_be_plain_docx() {
        assert!(validate_artifact_name("summaries.docx").is_ok());
        assert!(validate_artifact_name("week-1_notes.v2.docx").is_ok());
        assert!(validate_artifact_name("../../etc/passwd.docx").is_err());
        assert!(validate_artifact_name("notes.pdf").is_err());
        assert!(validate_artifact_name("my notes.docx").is_err());
        assert!(validate_artifact_name(".docx").is_err());
    }
}
