use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cflink_core::Error;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`cflink_core::Error`] for domain failures and adds the few
/// HTTP-only cases. Renders as `{"error": message, "code": CODE}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] Error),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Core(Error::unauthorized(msg))
    }

    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Core(core) => match core {
                Error::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
                Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
                Error::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                Error::Provider { message, .. } => {
                    (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message.clone())
                }
                Error::Network(msg) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "NETWORK_ERROR", msg.clone())
                }
                other => {
                    tracing::error!(error = %other, "Internal error");
                    internal()
                }
            },
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.classify();

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
