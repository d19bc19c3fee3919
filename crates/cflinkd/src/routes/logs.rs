use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use cflink_core::{LogEntry, LogQuery, LogScope};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::state::AppState;

/// `?skip=&limit=`; limit is clamped by `LogQuery::page`
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

/// GET /logs/ - the caller's activity, newest first
async fn user_logs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<LogEntry>>> {
    let query = LogQuery::new(LogScope::User(auth.user.id)).page(page.skip, page.limit);
    Ok(Json(state.services.logs.list(query).await?))
}

/// GET /logs/system - entries not tied to a user, newest first
async fn system_logs(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<LogEntry>>> {
    let query = LogQuery::new(LogScope::System).page(page.skip, page.limit);
    Ok(Json(state.services.logs.list(query).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logs", get(user_logs))
        .route("/logs/", get(user_logs))
        .route("/logs/system", get(system_logs))
}
