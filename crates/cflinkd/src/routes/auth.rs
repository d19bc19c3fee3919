//! Handlers for `/auth`: first-run setup, login and the current session.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use cflink_core::traits::ApiToken;
use cflink_core::{Error, LogScope, NewLogEntry, NewUser, User, UserId};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::auth::jwt::generate_token;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /auth/setup`
#[derive(Deserialize)]
pub struct SetupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Cloudflare API token, sealed before it is stored
    pub cloudflare_api_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct SetupStatus {
    pub needs_setup: bool,
}

/// Public view of a user
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /auth/setup-status
async fn setup_status(State(state): State<AppState>) -> AppResult<Json<SetupStatus>> {
    let users = state.services.users.count_users().await?;
    Ok(Json(SetupStatus {
        needs_setup: users == 0,
    }))
}

/// POST /auth/setup
///
/// Creates the first account. Refused once any user exists.
async fn setup(
    State(state): State<AppState>,
    Json(input): Json<SetupRequest>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let _guard = state.setup_lock.lock().await;

    if state.services.users.count_users().await? > 0 {
        return Err(AppError::Forbidden(
            "Setup is not allowed. Users already exist in the system.".to_string(),
        ));
    }

    let username = input.username.trim();
    let email = input.email.trim();
    let token = ApiToken::new(input.cloudflare_api_token.trim());

    if username.is_empty() {
        return Err(Error::validation("username is required").into());
    }
    if !email.contains('@') {
        return Err(Error::validation("email must be a valid address").into());
    }
    if token.is_empty() {
        return Err(Error::validation("cloudflare_api_token is required").into());
    }
    validate_password_strength(&input.password).map_err(Error::validation)?;

    let password_hash =
        hash_password(&input.password).map_err(|e| AppError::Internal(e.to_string()))?;
    let credential = state.services.cipher.encrypt(&token)?;

    let user = state
        .services
        .users
        .create_user(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            credential,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Initial setup completed");
    state
        .services
        .log(NewLogEntry::info(
            LogScope::User(user.id),
            format!(
                "Initial setup completed. Admin user {} created.",
                user.username
            ),
        ))
        .await;

    Ok((StatusCode::CREATED, Json(issue_token(&state, &user)?)))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let rejected = || AppError::unauthorized("Incorrect username or password");

    let user = state
        .services
        .users
        .find_by_username(input.username.trim())
        .await?
        .ok_or_else(rejected)?;

    let valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash unreadable: {}", e)))?;
    if !valid {
        tracing::warn!(username = %user.username, "Failed login attempt");
        return Err(rejected());
    }

    if !user.is_active {
        return Err(AppError::Forbidden("Inactive user".to_string()));
    }

    state
        .services
        .log(NewLogEntry::info(
            LogScope::User(user.id),
            format!("User {} logged in", user.username),
        ))
        .await;

    Ok(Json(issue_token(&state, &user)?))
}

/// GET /auth/me
async fn me(auth: AuthUser) -> Json<UserInfo> {
    Json(UserInfo::from(&auth.user))
}

fn issue_token(state: &AppState, user: &User) -> AppResult<TokenResponse> {
    let access_token = generate_token(user.id, &user.username, &state.jwt)
        .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))?;

    Ok(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.jwt.expires_in(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/setup-status", get(setup_status))
        .route("/auth/setup", post(setup))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}
