//! HTTP router assembly.
//!
//! Routes are grouped by who may call them: operator endpoints behind the
//! API keyring, host endpoints behind access tokens, the status endpoint
//! behind either, and a small anonymous surface for bootstrap.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Router, middleware};

use crate::auth::{JwtManager, OperatorKeyring};
use crate::checkin::CheckinProcessor;
use crate::dispatch::WorkDispatcher;
use crate::ratelimit::RateLimiter;
use crate::registration::RegistrationManager;
use crate::registry::HostRegistry;
use crate::server::{auth_layer, host_api, registration_api, work_api};
use crate::token::TokenIssuer;

#[derive(Clone)]
pub struct AppState {
    pub registrations: RegistrationManager,
    pub registry: HostRegistry,
    pub tokens: TokenIssuer,
    pub checkins: CheckinProcessor,
    pub dispatcher: WorkDispatcher,
    pub jwt: Arc<JwtManager>,
    pub operators: Arc<OperatorKeyring>,
    pub confirm_limiter: Arc<RateLimiter>,
}

pub fn build_router(state: AppState) -> Router {
    let operator_routes = Router::new()
        .route(
            "/registrations",
            post(registration_api::create_registration).get(registration_api::list_registrations),
        )
        .route(
            "/registrations/abandoned",
            delete(registration_api::purge_abandoned),
        )
        .route("/hosts", get(host_api::list_hosts))
        .route(
            "/hosts/{id}",
            get(host_api::get_host)
                .patch(host_api::update_host)
                .delete(host_api::delete_host),
        )
        .route("/hosts/{id}/checkins", get(host_api::list_host_checkins))
        .route("/checkins/older-than", delete(host_api::purge_checkins))
        .route("/work", post(work_api::create_work).get(work_api::list_work))
        .route("/work/older-than", delete(work_api::purge_work))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_layer::require_operator,
        ));

    let host_routes = Router::new()
        .route("/host/checkin", post(host_api::host_checkin))
        .route("/host/details", post(host_api::submit_details))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_layer::require_host_token,
        ));

    // Hosts advance their own items; operators cancel. Same endpoint.
    let shared_routes = Router::new()
        .route("/work/{id}/status", post(work_api::update_work_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_layer::require_identity,
        ));

    let open_routes = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/registrations/confirm",
            post(registration_api::confirm_registration),
        )
        .route("/host/token", post(host_api::issue_token));

    Router::new()
        .merge(operator_routes)
        .merge(host_routes)
        .merge(shared_routes)
        .merge(open_routes)
        .with_state(state)
}
