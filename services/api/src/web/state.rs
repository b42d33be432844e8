//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::{adapters::Workspace, config::Config, error::ApiError};
use lecture_agent_core::{
    domain::JobId,
    ports::{AgentService, DatabaseService, DocumentTextReader},
};
use std::sync::Arc;
use tokio::sync::RwLock;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    /// `None` when no database is configured; auth and history then answer 503.
    pub db: Option<Arc<dyn DatabaseService>>,
    pub config: Arc<Config>,
    pub workspace: Workspace,
    pub agent: Arc<dyn AgentService>,
    pub documents: Arc<dyn DocumentTextReader>,
    /// The most recently uploaded job, used when a request names none.
    pub latest_job: RwLock<Option<JobId>>,
}

impl AppState {
    pub fn new(
        db: Option<Arc<dyn DatabaseService>>,
        config: Arc<Config>,
        agent: Arc<dyn AgentService>,
        documents: Arc<dyn DocumentTextReader>,
    ) -> Self {
        Self {
            db,
            workspace: Workspace::new(config.workspace_dir.clone()),
            config,
            agent,
            documents,
            latest_job: RwLock::new(None),
        }
    }

    pub fn db(&self) -> Result<&Arc<dyn DatabaseService>, ApiError> {
        self.db.as_ref().ok_or_else(ApiError::database_unavailable)
    }

    /// The requested job, or the latest upload when none is named.
    pub async fn job_or_latest(&self, requested: Option<JobId>) -> Option<JobId> {
        match requested {
            Some(job) => Some(job),
            None => *self.latest_job.read().await,
        }
    }

    /// Fails with 404 unless the job's workspace exists.
    pub async fn existing_job(&self, job: JobId) -> Result<JobId, ApiError> {
        if self.workspace.exists(job).await {
            Ok(job)
        } else {
            Err(ApiError::NotFound(format!("Job {} not found", job)))
        }
    }
}
