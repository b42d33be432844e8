//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, logout, and the
//! current-user lookup.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use lecture_agent_core::{
    domain::{AuthSession, User},
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::ApiError,
    web::{
        middleware::{session_cookie, CurrentUser, AUTH_COOKIE},
        state::AppState,
    },
};

const SESSION_DAYS: i64 = 7;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The public view of a user account.
#[derive(Serialize, ToSchema)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            verified: user.verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub ok: bool,
    pub user: UserView,
}

#[derive(Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

//=========================================================================================
// Cookie and Session Helpers
//=========================================================================================

fn auth_cookie(value: &str, max_age: i64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        AUTH_COOKIE,
        value,
        max_age,
        if secure { "; Secure" } else { "" }
    )
}

/// Creates a server-side session for the user and returns the `Set-Cookie` value.
async fn start_session(state: &AppState, user_id: Uuid) -> Result<String, ApiError> {
    let session = AuthSession {
        id: Uuid::new_v4().to_string(),
        user_id,
        expires_at: Utc::now() + Duration::days(SESSION_DAYS),
    };
    let cookie = auth_cookie(
        &session.id,
        Duration::days(SESSION_DAYS).num_seconds(),
        state.config.cookie_secure,
    );
    state.db()?.create_auth_session(session).await?;
    Ok(cookie)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account and log it in
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Missing name, email, or password"),
        (status = 409, description = "Email already registered"),
        (status = 503, description = "Database not available")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db()?;

    let name = req.name.trim();
    let email = normalize_email(&req.email);
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Name, email, and password are required".to_string(),
        ));
    }

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .to_string();

    // 2. Create user in database
    let user = db.create_user(name, &email, &password_hash).await?;
    info!(user_id = %user.id, "User registered");

    // 3. Log the new user in
    let cookie = start_session(&state, user.id).await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            ok: true,
            user: user.into(),
        }),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 503, description = "Database not available")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db()?;

    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    // 1. Get user by email
    let creds = db.get_user_by_email(&email).await.map_err(|e| match e {
        PortError::NotFound(_) => invalid(),
        other => ApiError::Port(other),
    })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(invalid());
    }

    // 3. Start a session
    let cookie = start_session(&state, creds.user.id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            ok: true,
            user: creds.user.into(),
        }),
    ))
}

/// POST /api/auth/logout - Clear the auth cookie and end the session
///
/// Always succeeds, with or without a prior session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = OkResponse)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let (Some(db), Some(auth_session_id)) = (state.db.as_ref(), session_cookie(&headers)) {
        if let Err(e) = db.delete_auth_session(&auth_session_id).await {
            warn!("Failed to delete auth session: {}", e);
        }
    }

    (
        StatusCode::OK,
        [(header::SET_COOKIE, auth_cookie("", 0, state.config.cookie_secure))],
        Json(OkResponse { ok: true }),
    )
}

/// GET /api/me - The currently authenticated user
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = AuthResponse),
        (status = 401, description = "Not authenticated"),
        (status = 503, description = "Database not available")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .db()?
        .get_user_by_id(user_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::Unauthorized("User no longer exists".to_string()),
            other => ApiError::Port(other),
        })?;

    Ok(Json(AuthResponse {
        ok: true,
        user: user.into(),
    }))
}
