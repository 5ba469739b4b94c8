//! Work queue endpoints.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::dispatch::{WorkCommand, WorkStatus};
use crate::error::FleetError;
use crate::server::auth_layer::AuthIdentity;
use crate::server::router::AppState;
use crate::storage::WorkItem;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkRequest {
    pub host_id: String,
    #[serde(flatten)]
    pub command: WorkCommand,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkResponse {
    pub work_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemView {
    pub id: i64,
    pub host_id: String,
    pub target_type: String,
    pub status: String,
    pub payload: Option<serde_json::Value>,
    pub result_data: Option<String>,
    pub created_at: i64,
    pub modified_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkStatusRequest {
    pub status: WorkStatus,
    pub result_payload: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWorkQuery {
    pub host_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PurgeWorkQuery {
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct PurgeWorkResponse {
    pub removed: u64,
}

pub fn work_item_to_view(item: &WorkItem) -> WorkItemView {
    // Stored commands are adjacently tagged; the view surfaces only the
    // variant payload since `target_type` already carries the tag.
    let payload = serde_json::from_str::<serde_json::Value>(&item.work_data)
        .ok()
        .and_then(|v| v.get("payload").cloned());

    WorkItemView {
        id: item.id,
        host_id: item.host_id.clone(),
        target_type: item.target_type.clone(),
        status: item.status.clone(),
        payload,
        result_data: item.result_data.clone(),
        created_at: item.created_at,
        modified_at: item.modified_at,
    }
}

#[instrument(skip_all, fields(api = "CreateWork"))]
pub async fn create_work(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<CreateWorkRequest>,
) -> Result<Json<CreateWorkResponse>, FleetError> {
    let item = state
        .dispatcher
        .create(&req.host_id, &req.command, &identity.actor())
        .await?;

    Ok(Json(CreateWorkResponse { work_id: item.id }))
}

#[instrument(skip_all, fields(api = "ListWork"))]
pub async fn list_work(
    State(state): State<AppState>,
    Query(query): Query<ListWorkQuery>,
) -> Result<Json<Vec<WorkItemView>>, FleetError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            WorkStatus::parse(s)
                .ok_or_else(|| FleetError::Validation(format!("Unknown work status {s}")))
        })
        .transpose()?;

    let items = state.dispatcher.list(query.host_id.as_deref(), status).await?;
    Ok(Json(items.iter().map(work_item_to_view).collect()))
}

#[instrument(skip_all, fields(api = "UpdateWorkStatus"))]
pub async fn update_work_status(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Path(work_id): Path<i64>,
    Json(req): Json<UpdateWorkStatusRequest>,
) -> Result<Json<WorkItemView>, FleetError> {
    let item = state
        .dispatcher
        .update_status(
            work_id,
            req.status,
            req.result_payload.as_deref(),
            &identity.actor(),
        )
        .await?;

    Ok(Json(work_item_to_view(&item)))
}

#[instrument(skip_all, fields(api = "PurgeWork"))]
pub async fn purge_work(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Query(query): Query<PurgeWorkQuery>,
) -> Result<Json<PurgeWorkResponse>, FleetError> {
    let removed = state
        .dispatcher
        .purge_older_than(query.timestamp, &identity.actor())
        .await?;

    Ok(Json(PurgeWorkResponse { removed }))
}
