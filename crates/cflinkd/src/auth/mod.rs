//! Bearer-token authentication for the HTTP API.

pub mod jwt;
pub mod password;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use cflink_core::{RequestContext, User};

use crate::error::AppError;
use crate::state::AppState;

/// Authenticated, active user resolved from the `Authorization` header.
///
/// Use as an extractor in any handler that requires a session:
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user.id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    /// Caller context for reconciler and record-manager calls
    pub fn ctx(&self) -> RequestContext {
        RequestContext::from(&self.user)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Invalid Authorization format. Expected: Bearer <token>")
        })?;

        let claims = jwt::validate_token(token, &state.jwt)
            .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

        let user = state
            .services
            .users
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired token"))?;

        if !user.is_active {
            return Err(AppError::unauthorized("Inactive user"));
        }

        Ok(AuthUser { user })
    }
}
