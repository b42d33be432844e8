//! services/api/src/web/jobs.rs
//!
//! The job flow: upload files into a job workspace, run the summarization agent
//! over them, and report what it produced.

use axum::{
    extract::{Multipart, Query, State},
    Extension, Json,
};
use lecture_agent_core::domain::{AgentRun, Artifact, ArtifactKind, JobId, StoredFile};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    adapters::{Staging, Workspace},
    error::ApiError,
    web::{history::record_job_history, middleware::MaybeUser, state::AppState},
};

/// Most files accepted in one upload.
pub const MAX_FILES: usize = 50;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// Selects a job; the latest upload is used when omitted.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobQuery {
    pub job: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileView {
    pub name: String,
    pub size: u64,
}

impl From<StoredFile> for FileView {
    fn from(file: StoredFile) -> Self {
        Self {
            name: file.name,
            size: file.size,
        }
    }
}

impl From<Artifact> for FileView {
    fn from(artifact: Artifact) -> Self {
        Self {
            name: artifact.name,
            size: artifact.size,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub ok: bool,
    pub job_id: Uuid,
    pub files: Vec<FileView>,
}

/// Which of the three expected artifacts exist.
#[derive(Debug, Serialize, ToSchema)]
pub struct LegacyArtifacts {
    pub summaries: bool,
    pub flashcards: bool,
    pub formula_sheet: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArtifactUrls {
    pub summaries: String,
    pub flashcards: String,
    pub formula_sheet: String,
    pub preview: String,
}

/// The completion report of one run. Sent with 200 whatever the exit code.
#[derive(Debug, Serialize, ToSchema)]
pub struct RunResponse {
    pub ok: bool,
    pub code: i32,
    pub log: String,
    pub job_id: Uuid,
    /// Names of every `.docx` in the output directory.
    pub files: Vec<String>,
    pub artifacts: Vec<FileView>,
    pub legacy: LegacyArtifacts,
    pub urls: ArtifactUrls,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResetResponse {
    pub ok: bool,
}

//=========================================================================================
// Result Reporting
//=========================================================================================

pub fn download_url(job: JobId, file_name: &str) -> String {
    format!("/api/download/{}?job={}", file_name, job)
}

/// Builds the completion report from the agent's result and the job's output directory.
pub async fn build_report(
    workspace: &Workspace,
    job: JobId,
    run: AgentRun,
) -> io::Result<RunResponse> {
    let artifacts = workspace.list_artifacts(job).await?;
    let produced = |kind: ArtifactKind| artifacts.iter().any(|a| a.name == kind.file_name());

    let legacy = LegacyArtifacts {
        summaries: produced(ArtifactKind::Summaries),
        flashcards: produced(ArtifactKind::Flashcards),
        formula_sheet: produced(ArtifactKind::FormulaSheet),
    };
    let urls = ArtifactUrls {
        summaries: download_url(job, ArtifactKind::Summaries.file_name()),
        flashcards: download_url(job, ArtifactKind::Flashcards.file_name()),
        formula_sheet: download_url(job, ArtifactKind::FormulaSheet.file_name()),
        preview: format!("/api/summary-preview?job={}", job),
    };

    Ok(RunResponse {
        ok: run.succeeded(),
        code: run.code,
        log: run.log,
        job_id: job,
        files: artifacts.iter().map(|a| a.name.clone()).collect(),
        artifacts: artifacts.into_iter().map(FileView::from).collect(),
        legacy,
        urls,
    })
}

/// Streams every file part of the request into `staging`.
async fn receive_files(staging: &mut Staging, multipart: &mut Multipart) -> Result<(), ApiError> {
    let mut received = 0;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        let Some(file_name) = field.file_name().filter(|n| !n.is_empty()).map(str::to_string)
        else {
            continue;
        };
        if received == MAX_FILES {
            return Err(ApiError::BadRequest(format!(
                "At most {} files can be uploaded at once",
                MAX_FILES
            )));
        }
        received += 1;

        let mut input = staging
            .create_file(&file_name)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::InvalidInput => ApiError::BadRequest(e.to_string()),
                _ => ApiError::Io(e),
            })?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?
        {
            input.write(&chunk).await?;
        }
        staging.add(input.finish().await?);
    }
    Ok(())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Upload lecture documents into a job workspace.
///
/// Without `job` a new job is created. With `job` that job's previous input and
/// output are replaced, but only once the whole upload has been received; a
/// rejected upload changes nothing.
#[utoipa::path(
    post,
    path = "/api/upload",
    params(JobQuery),
    request_body(content_type = "multipart/form-data", description = "Up to 50 lecture documents."),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "Too many files or unreadable multipart body"),
        (status = 404, description = "Unknown job")
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let job = match query.job {
        Some(job) => state.existing_job(job).await?,
        None => Uuid::new_v4(),
    };

    let mut staging = state.workspace.stage().await?;
    if let Err(e) = receive_files(&mut staging, &mut multipart).await {
        if let Err(cleanup) = staging.discard().await {
            warn!(%job, error = %cleanup, "Failed to discard rejected upload");
        }
        return Err(e);
    }
    let files = staging.commit(&state.workspace, job).await?;

    *state.latest_job.write().await = Some(job);
    info!(%job, count = files.len(), "Files uploaded");

    Ok(Json(UploadResponse {
        ok: true,
        job_id: job,
        files: files.into_iter().map(FileView::from).collect(),
    }))
}

/// Run the summarization agent over a job's uploaded files.
///
/// A non-zero exit is reported with `ok: false` and the captured log, not as an
/// HTTP error.
#[utoipa::path(
    post,
    path = "/api/run",
    params(JobQuery),
    responses(
        (status = 200, description = "Agent finished (check `ok`)", body = RunResponse),
        (status = 400, description = "No files uploaded"),
        (status = 404, description = "Unknown job"),
        (status = 500, description = "No interpreter could be started")
    )
)]
pub async fn run_handler(
    State(state): State<Arc<AppState>>,
    Extension(MaybeUser(user)): Extension<MaybeUser>,
    Query(query): Query<JobQuery>,
) -> Result<Json<RunResponse>, ApiError> {
    let no_files = || ApiError::BadRequest("No files uploaded".to_string());

    let job = state.job_or_latest(query.job).await.ok_or_else(no_files)?;
    let job = state.existing_job(job).await?;
    let inputs = state.workspace.list_inputs(job).await?;
    if inputs.is_empty() {
        return Err(no_files());
    }

    let input_dir = state.workspace.input_dir(job);
    let output_dir = state.workspace.output_dir(job);
    tokio::fs::create_dir_all(&output_dir).await?;

    info!(%job, files = inputs.len(), "Running agent");
    let run = state.agent.run(&input_dir, &output_dir).await?;
    if !run.succeeded() {
        warn!(%job, code = run.code, "Agent exited with failure");
    }

    let report = build_report(&state.workspace, job, run).await?;
    if report.ok {
        if let Some(user_id) = user {
            record_job_history(&state, user_id, inputs);
        }
    }

    Ok(Json(report))
}

/// Delete a job's workspace, or every job when none is named.
#[utoipa::path(
    post,
    path = "/api/reset",
    params(JobQuery),
    responses(
        (status = 200, description = "Workspace cleared", body = ResetResponse)
    )
)]
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobQuery>,
) -> Result<Json<ResetResponse>, ApiError> {
    let mut latest = state.latest_job.write().await;
    match query.job {
        Some(job) => {
            state.workspace.remove(job).await?;
            if *latest == Some(job) {
                *latest = None;
            }
            info!(%job, "Job removed");
        }
        None => {
            state.workspace.remove_all().await?;
            *latest = None;
            info!("All jobs removed");
        }
    }
    Ok(Json(ResetResponse { ok: true }))
}
