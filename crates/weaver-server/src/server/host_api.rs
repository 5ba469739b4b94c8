//! Host registry and host-facing endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::checkin::TelemetryReport;
use crate::error::FleetError;
use crate::registry::{HostDetails, HostPatch, HostState};
use crate::server::auth_layer::AuthIdentity;
use crate::server::router::AppState;
use crate::server::work_api::{WorkItemView, work_item_to_view};
use crate::storage::{Host, HostCheckin};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostView {
    pub id: String,
    pub owner_id: String,
    pub hostname: String,
    pub friendly_name: String,
    pub description: String,
    pub private_address: String,
    pub public_address: String,
    pub os: String,
    pub cpu_info: String,
    pub network_info: String,
    pub storage_info: String,
    pub current_state: String,
    pub last_checkin_at: Option<i64>,
    pub created_at: i64,
    pub modified_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinView {
    pub id: i64,
    pub host_id: String,
    pub send_timestamp: i64,
    pub receive_timestamp: i64,
    pub cpu_usage: f64,
    pub ram_usage: f64,
    pub uptime: i64,
    pub network_in_bytes: i64,
    pub network_out_bytes: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListHostsQuery {
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHostRequest {
    pub friendly_name: Option<String>,
    pub description: Option<String>,
    pub private_address: Option<String>,
    pub public_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckinHistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeCheckinsQuery {
    pub timestamp: i64,
    pub host_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PurgeCheckinsResponse {
    pub removed: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub host_id: String,
    pub credential: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_at_utc: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    pub send_timestamp: i64,
    pub cpu_usage: f64,
    pub ram_usage: f64,
    pub uptime: i64,
    pub network_in_bytes: i64,
    pub network_out_bytes: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponse {
    pub work_items: Vec<WorkItemView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDetailsRequest {
    pub hostname: String,
    pub os: String,
    pub cpu_info: String,
    pub network_info: String,
    pub storage_info: String,
}

/// Credential hashes never leave the server; the view carries the rest.
pub fn host_to_view(h: &Host) -> HostView {
    HostView {
        id: h.id.clone(),
        owner_id: h.owner_id.clone(),
        hostname: h.hostname.clone(),
        friendly_name: h.friendly_name.clone(),
        description: h.description.clone(),
        private_address: h.private_address.clone(),
        public_address: h.public_address.clone(),
        os: h.os.clone(),
        cpu_info: h.cpu_info.clone(),
        network_info: h.network_info.clone(),
        storage_info: h.storage_info.clone(),
        current_state: h.current_state.clone(),
        last_checkin_at: h.last_checkin_at,
        created_at: h.created_at,
        modified_at: h.modified_at,
    }
}

pub fn checkin_to_view(c: &HostCheckin) -> CheckinView {
    CheckinView {
        id: c.id,
        host_id: c.host_id.clone(),
        send_timestamp: c.send_timestamp,
        receive_timestamp: c.receive_timestamp,
        cpu_usage: c.cpu_usage,
        ram_usage: c.ram_usage,
        uptime: c.uptime_secs,
        network_in_bytes: c.network_in_bytes,
        network_out_bytes: c.network_out_bytes,
    }
}

#[instrument(skip_all, fields(api = "ListHosts"))]
pub async fn list_hosts(
    State(state): State<AppState>,
    Query(query): Query<ListHostsQuery>,
) -> Result<Json<Vec<HostView>>, FleetError> {
    let filter = query
        .state
        .as_deref()
        .map(|s| {
            HostState::parse(s)
                .ok_or_else(|| FleetError::Validation(format!("Unknown host state {s}")))
        })
        .transpose()?;

    let hosts = state.registry.list(filter).await?;
    Ok(Json(hosts.iter().map(host_to_view).collect()))
}

#[instrument(skip_all, fields(api = "GetHost"))]
pub async fn get_host(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
) -> Result<Json<HostView>, FleetError> {
    let host = state.registry.get(&host_id).await?;
    Ok(Json(host_to_view(&host)))
}

#[instrument(skip_all, fields(api = "UpdateHost"))]
pub async fn update_host(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Path(host_id): Path<String>,
    Json(req): Json<UpdateHostRequest>,
) -> Result<Json<HostView>, FleetError> {
    let patch = HostPatch {
        friendly_name: req.friendly_name,
        description: req.description,
        private_address: req.private_address,
        public_address: req.public_address,
    };
    let host = state
        .registry
        .update(&host_id, &patch, &identity.actor())
        .await?;

    Ok(Json(host_to_view(&host)))
}

#[instrument(skip_all, fields(api = "RemoveHost"))]
pub async fn delete_host(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Path(host_id): Path<String>,
) -> Result<StatusCode, FleetError> {
    state.registry.remove(&host_id, &identity.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(api = "ListHostCheckins"))]
pub async fn list_host_checkins(
    State(state): State<AppState>,
    Path(host_id): Path<String>,
    Query(query): Query<CheckinHistoryQuery>,
) -> Result<Json<Vec<CheckinView>>, FleetError> {
    let limit = query.limit.unwrap_or(100);
    let checkins = state.checkins.recent(&host_id, limit).await?;
    Ok(Json(checkins.iter().map(checkin_to_view).collect()))
}

#[instrument(skip_all, fields(api = "PurgeCheckins"))]
pub async fn purge_checkins(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Query(query): Query<PurgeCheckinsQuery>,
) -> Result<Json<PurgeCheckinsResponse>, FleetError> {
    let removed = state
        .checkins
        .purge_older_than(query.timestamp, query.host_id.as_deref(), &identity.actor())
        .await?;

    Ok(Json(PurgeCheckinsResponse { removed }))
}

#[instrument(skip_all, fields(api = "IssueToken"))]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, FleetError> {
    let issued = state.tokens.issue(&req.host_id, &req.credential).await?;

    Ok(Json(TokenResponse {
        access_token: issued.token,
        expires_at_utc: issued.expires_at,
    }))
}

#[instrument(skip_all, fields(api = "CheckIn"))]
pub async fn host_checkin(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<CheckinRequest>,
) -> Result<Json<CheckinResponse>, FleetError> {
    let host_id = identity.host_id().ok_or(FleetError::Authentication)?;

    let report = TelemetryReport {
        send_timestamp: req.send_timestamp,
        cpu_usage: req.cpu_usage,
        ram_usage: req.ram_usage,
        uptime_secs: req.uptime,
        network_in_bytes: req.network_in_bytes,
        network_out_bytes: req.network_out_bytes,
    };
    let batch = state.checkins.check_in(host_id, &report).await?;

    Ok(Json(CheckinResponse {
        work_items: batch.iter().map(work_item_to_view).collect(),
    }))
}

#[instrument(skip_all, fields(api = "SubmitHostDetails"))]
pub async fn submit_details(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<HostDetailsRequest>,
) -> Result<StatusCode, FleetError> {
    let host_id = identity.host_id().ok_or(FleetError::Authentication)?;

    let details = HostDetails {
        hostname: req.hostname,
        os: req.os,
        cpu_info: req.cpu_info,
        network_info: req.network_info,
        storage_info: req.storage_info,
    };
    state.registry.submit_details(host_id, &details).await?;

    Ok(StatusCode::NO_CONTENT)
}
