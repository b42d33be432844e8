//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use lecture_agent_core::ports::PortError;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{error::ApiError, web::state::AppState};

/// Name of the cookie carrying the auth session id.
pub const AUTH_COOKIE: &str = "token";

/// The authenticated caller, inserted by `require_auth`.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

/// The caller if authenticated, inserted by `optional_auth`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaybeUser(pub Option<Uuid>);

/// Extracts the auth session id from the `Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", AUTH_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix(prefix.as_str()))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Middleware that validates the auth session cookie and extracts the user id.
///
/// If valid, inserts `CurrentUser` into request extensions for handlers to use.
/// Without a database the route is unavailable (503); a missing or invalid
/// session is 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let db = state.db()?;

    let auth_session_id = session_cookie(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let user_id = db
        .validate_auth_session(&auth_session_id)
        .await
        .map_err(|e| match e {
            PortError::Unexpected(_) => {
                error!("Failed to validate auth session: {:?}", e);
                ApiError::Port(e)
            }
            _ => ApiError::Unauthorized("Invalid or expired session".to_string()),
        })?;

    req.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(req).await)
}

/// Like `require_auth`, but never rejects: anonymous callers get `MaybeUser(None)`.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let mut user = None;
    if let (Some(db), Some(auth_session_id)) = (state.db.as_ref(), session_cookie(req.headers())) {
        match db.validate_auth_session(&auth_session_id).await {
            Ok(user_id) => user = Some(user_id),
            Err(e) => debug!("Ignoring invalid auth session: {}", e),
        }
    }

    req.extensions_mut().insert(MaybeUser(user));
    next.run(req).await
}
