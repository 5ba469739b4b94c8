//! Registration bootstrap endpoints.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::FleetError;
use crate::server::auth_layer::AuthIdentity;
use crate::server::router::AppState;
use crate::storage::HostRegistration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistrationRequest {
    pub description: String,
    pub owner_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCreatedResponse {
    pub host_id: String,
    /// One-time key, shown only in this response.
    pub key: String,
    pub confirmation_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationView {
    pub id: String,
    pub host_id: String,
    pub description: String,
    pub active: bool,
    pub activation_timestamp: Option<i64>,
    pub activation_source_address: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRegistrationRequest {
    pub host_id: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRegistrationResponse {
    pub host_id: String,
    /// Long-lived credential the host stores for token requests.
    pub host_token: String,
}

#[derive(Debug, Deserialize)]
pub struct PurgeAbandonedQuery {
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeAbandonedResponse {
    pub registrations_removed: u64,
    pub hosts_removed: u64,
}

/// Key digests never leave the server; the view carries everything else.
pub fn registration_to_view(r: &HostRegistration) -> RegistrationView {
    RegistrationView {
        id: r.id.clone(),
        host_id: r.host_id.clone(),
        description: r.description.clone(),
        active: r.active != 0,
        activation_timestamp: r.activation_timestamp,
        activation_source_address: r.activation_source_address.clone(),
        created_at: r.created_at,
    }
}

#[instrument(skip_all, fields(api = "CreateRegistration"))]
pub async fn create_registration(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Json(req): Json<CreateRegistrationRequest>,
) -> Result<Json<RegistrationCreatedResponse>, FleetError> {
    let generated = state
        .registrations
        .generate(&req.description, &req.owner_id, &identity.actor())
        .await?;

    Ok(Json(RegistrationCreatedResponse {
        host_id: generated.host_id,
        key: generated.key,
        confirmation_uri: generated.confirmation_url,
    }))
}

#[instrument(skip_all, fields(api = "ListRegistrations"))]
pub async fn list_registrations(
    State(state): State<AppState>,
) -> Result<Json<Vec<RegistrationView>>, FleetError> {
    let registrations = state.registrations.list().await?;
    Ok(Json(registrations.iter().map(registration_to_view).collect()))
}

#[instrument(skip_all, fields(api = "ConfirmRegistration"))]
pub async fn confirm_registration(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ConfirmRegistrationRequest>,
) -> Result<Json<ConfirmRegistrationResponse>, FleetError> {
    state.confirm_limiter.check(addr.ip())?;

    let confirmed = state
        .registrations
        .confirm(&req.host_id, &req.key, &addr.ip().to_string())
        .await?;

    Ok(Json(ConfirmRegistrationResponse {
        host_id: confirmed.host_id,
        host_token: confirmed.credential,
    }))
}

#[instrument(skip_all, fields(api = "PurgeAbandonedRegistrations"))]
pub async fn purge_abandoned(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Query(query): Query<PurgeAbandonedQuery>,
) -> Result<Json<PurgeAbandonedResponse>, FleetError> {
    let (registrations_removed, hosts_removed) = state
        .registrations
        .purge_abandoned(query.timestamp, &identity.actor())
        .await?;

    Ok(Json(PurgeAbandonedResponse {
        registrations_removed,
        hosts_removed,
    }))
}
