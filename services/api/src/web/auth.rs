//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and the current user.

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
use debaide_core::ports::PortError;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::extract_token;
use crate::web::protocol::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::web::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

//=========================================================================================
// Helpers
//=========================================================================================

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        token,
        ttl.num_seconds()
    )
}

/// Stores a fresh login token for the user and returns it with its expiry.
async fn issue_token(state: &AppState, user_id: Uuid) -> Result<(String, DateTime<Utc>), ApiError> {
    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(state.config.auth_token_ttl_days);
    state.db.create_auth_session(&token, user_id, expires_at).await?;
    Ok((token, expires_at))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created and signed in", body = AuthResponse),
        (status = 400, description = "Missing fields, or username/email already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim();
    let email = req.email.trim();
    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username, email and password are required".to_string(),
        ));
    }

    // 1. Hash the password
    let password_hash = hash_password(&req.password)?;

    // 2. Create the user, rejecting taken usernames and emails
    let user = state
        .db
        .create_user(username, email, &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => ApiError::BadRequest("Username or email already registered".to_string()),
            other => ApiError::Port(other),
        })?;

    // 3. Every account starts with an empty stats record
    state.stats.fetch_or_create(user.id).await?;

    // 4. Sign the new user in
    let (token, expires_at) = issue_token(&state, user.id).await?;
    let cookie = session_cookie(&token, Duration::days(state.config.auth_token_ttl_days));
    info!("Registered user {} ({}).", user.username, user.id);

    let response = AuthResponse {
        user_id: user.id,
        username: user.username,
        email: user.email,
        token,
        expires_at,
    };
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Get user by username
    let creds = state
        .db
        .get_user_by_username(req.username.trim())
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()),
            other => ApiError::Port(other),
        })?;

    // 2. Verify password
    if !verify_password(&req.password, &creds.hashed_password)? {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    // 3. Issue the token and cookie
    let (token, expires_at) = issue_token(&state, creds.user_id).await?;
    let cookie = session_cookie(&token, Duration::days(state.config.auth_token_ttl_days));
    info!("User {} logged in.", creds.username);

    let response = AuthResponse {
        user_id: creds.user_id,
        username: creds.username,
        email: creds.email,
        token,
        expires_at,
    };
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate the token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_token(&headers).ok_or_else(|| ApiError::Unauthorized("No session found".to_string()))?;
    state.db.delete_auth_session(token).await?;

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/me - The signed-in user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The current user", body = UserResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.db.get_user_by_id(user_id).await?;
    Ok(Json(user.into()))
}
