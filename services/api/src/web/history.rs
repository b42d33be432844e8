//! services/api/src/web/history.rs
//!
//! Per-user activity history: the recorder used after successful runs and the
//! endpoints for listing and clearing it.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use lecture_agent_core::domain::{HistoryEntry, NewHistoryEntry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::ApiError,
    web::{middleware::CurrentUser, state::AppState},
};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, between 1 and 100.
    pub limit: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryItem {
    pub id: Uuid,
    pub action: String,
    pub details: String,
    pub files: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<HistoryEntry> for HistoryItem {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            id: entry.id,
            action: entry.action,
            details: entry.details,
            files: entry.files,
            timestamp: entry.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub ok: bool,
    pub items: Vec<HistoryItem>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Serialize, ToSchema)]
pub struct ClearHistoryResponse {
    pub ok: bool,
    pub deleted: u64,
}

//=========================================================================================
// Recorder
//=========================================================================================

/// Appends a "process" entry for the user in the background.
///
/// Never blocks the caller; failures are only logged.
pub fn record_job_history(state: &AppState, user_id: Uuid, files: Vec<String>) {
    let Some(db) = state.db.clone() else {
        return;
    };
    let entry = NewHistoryEntry {
        user_id,
        action: "process".to_string(),
        details: format!("Processed {} file(s)", files.len()),
        files,
    };
    tokio::spawn(async move {
        match db.append_history(entry).await {
            Ok(saved) => debug!(user_id = %saved.user_id, entry = %saved.id, "History recorded"),
            Err(e) => warn!(%user_id, "Failed to record history: {}", e),
        }
    });
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's history, newest first.
#[utoipa::path(
    get,
    path = "/api/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "A page of history entries", body = HistoryResponse),
        (status = 401, description = "Not authenticated"),
        (status = 503, description = "Database not available")
    )
)]
pub async fn list_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = u64::from(page - 1) * u64::from(limit);

    let history = state.db()?.list_history(user_id, limit, offset).await?;

    Ok(Json(HistoryResponse {
        ok: true,
        items: history.entries.into_iter().map(HistoryItem::from).collect(),
        total: history.total,
        page,
        limit,
    }))
}

/// Delete every history entry of the caller.
#[utoipa::path(
    delete,
    path = "/api/history",
    responses(
        (status = 200, description = "History cleared", body = ClearHistoryResponse),
        (status = 401, description = "Not authenticated"),
        (status = 503, description = "Database not available")
    )
)]
pub async fn clear_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<ClearHistoryResponse>, ApiError> {
    let deleted = state.db()?.clear_history(user_id).await?;
    Ok(Json(ClearHistoryResponse { ok: true, deleted }))
}
