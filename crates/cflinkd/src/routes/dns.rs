//! Handlers for `/dns`: record lifecycle, zones and IP reconciliation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use cflink_core::traits::ProviderRecord;
use cflink_core::{
    BatchSummary, CreateRecordRequest, DnsRecord, Error, ReconcileOutcome, RecordId,
    UpdateRecordRequest, Zone,
};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ZonesResponse {
    pub zones: Vec<Zone>,
}

#[derive(Debug, Serialize)]
pub struct ProviderRecordsResponse {
    pub records: Vec<ProviderRecord>,
}

#[derive(Debug, Serialize)]
pub struct CurrentIpResponse {
    pub ip: String,
}

/// Result of `POST /dns/{id}/update-ip`
#[derive(Debug, Serialize)]
pub struct UpdateIpResponse {
    pub record: DnsRecord,
    pub outcome: ReconcileOutcome,
}

/// Result of `POST /dns/update-all-ips`
#[derive(Debug, Serialize)]
pub struct UpdateAllResponse {
    pub message: String,
    #[serde(flatten)]
    pub summary: BatchSummary,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /dns/
async fn list_records(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<DnsRecord>>> {
    Ok(Json(state.records.list_records(&auth.ctx()).await?))
}

/// GET /dns/{id}
async fn get_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<RecordId>,
) -> AppResult<Json<DnsRecord>> {
    Ok(Json(state.records.get_record(&auth.ctx(), id).await?))
}

/// POST /dns/
async fn create_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateRecordRequest>,
) -> AppResult<(StatusCode, Json<DnsRecord>)> {
    let record = state.records.create_record(&auth.ctx(), input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /dns/{id}
async fn update_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<RecordId>,
    Json(input): Json<UpdateRecordRequest>,
) -> AppResult<Json<DnsRecord>> {
    Ok(Json(state.records.update_record(&auth.ctx(), id, input).await?))
}

/// DELETE /dns/{id}
async fn delete_record(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<RecordId>,
) -> AppResult<StatusCode> {
    state.records.delete_record(&auth.ctx(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /dns/zones
async fn list_zones(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ZonesResponse>> {
    let zones = state.records.list_zones(&auth.ctx()).await?;
    Ok(Json(ZonesResponse { zones }))
}

/// GET /dns/records/{zone_id}
async fn list_provider_records(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(zone_id): Path<String>,
) -> AppResult<Json<ProviderRecordsResponse>> {
    let records = state
        .records
        .list_provider_records(&auth.ctx(), &zone_id)
        .await?;
    Ok(Json(ProviderRecordsResponse { records }))
}

/// GET /dns/current-ip
async fn current_ip(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<CurrentIpResponse>> {
    let ip = state.records.current_ip(&auth.ctx()).await?;
    Ok(Json(CurrentIpResponse { ip: ip.to_string() }))
}

/// POST /dns/{id}/update-ip
///
/// Updated and skipped outcomes answer 200. A record type that never
/// follows the public IP answers 400; a failed provider update answers 502.
async fn update_ip(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<RecordId>,
) -> AppResult<Json<UpdateIpResponse>> {
    let ctx = auth.ctx();
    let outcome = state.reconciler.reconcile(&ctx, id).await?;

    match outcome {
        ReconcileOutcome::NotApplicable => Err(AppError::BadRequest(
            "IP updates only apply to A and AAAA records".to_string(),
        )),
        ReconcileOutcome::Failed { reason } => Err(Error::provider(
            state.services.provider.provider_name(),
            reason,
        )
        .into()),
        outcome => {
            let record = state.records.get_record(&ctx, id).await?;
            Ok(Json(UpdateIpResponse { record, outcome }))
        }
    }
}

/// POST /dns/update-all-ips
async fn update_all_ips(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<UpdateAllResponse>> {
    let summary = state.reconciler.reconcile_all(&auth.ctx()).await?;
    Ok(Json(UpdateAllResponse {
        message: summary.message(),
        summary,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dns", get(list_records).post(create_record))
        .route("/dns/", get(list_records).post(create_record))
        .route("/dns/zones", get(list_zones))
        .route("/dns/current-ip", get(current_ip))
        .route("/dns/update-all-ips", post(update_all_ips))
        .route("/dns/records/{zone_id}", get(list_provider_records))
        .route(
            "/dns/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/dns/{id}/update-ip", post(update_ip))
}
