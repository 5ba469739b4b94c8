//! Tests for registration bootstrap endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{Extension, Json};

use super::registration_api::{
    self, ConfirmRegistrationRequest, CreateRegistrationRequest, PurgeAbandonedQuery,
};
use super::test_helpers::{confirmed_host, operator, source, source_from, test_state};
use crate::error::FleetError;
use crate::ratelimit::{RateLimitConfig, RateLimiter};
use weaver_core::unix_timestamp;

fn create_request() -> CreateRegistrationRequest {
    CreateRegistrationRequest {
        description: "rack host".to_string(),
        owner_id: "u1".to_string(),
    }
}

#[tokio::test]
async fn create_returns_key_and_confirmation_uri() {
    let state = test_state().await;

    let resp = registration_api::create_registration(
        State(state.clone()),
        Extension(operator()),
        Json(create_request()),
    )
    .await
    .unwrap()
    .0;

    assert!(!resp.host_id.is_empty());
    assert_eq!(resp.key.len(), 64);
    assert_eq!(resp.confirmation_uri, "https://fleet.test/registrations/confirm");

    let listed = registration_api::list_registrations(State(state))
        .await
        .unwrap()
        .0;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].host_id, resp.host_id);
    assert!(listed[0].active);
    assert_eq!(listed[0].activation_timestamp, None);
}

#[tokio::test]
async fn create_with_unknown_owner_fails() {
    let state = test_state().await;

    let err = registration_api::create_registration(
        State(state),
        Extension(operator()),
        Json(CreateRegistrationRequest {
            description: "rack host".to_string(),
            owner_id: "nobody".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FleetError::Validation(_)));
}

#[tokio::test]
async fn confirm_succeeds_exactly_once() {
    let state = test_state().await;

    let created = registration_api::create_registration(
        State(state.clone()),
        Extension(operator()),
        Json(create_request()),
    )
    .await
    .unwrap()
    .0;

    let confirmed = registration_api::confirm_registration(
        State(state.clone()),
        source(),
        Json(ConfirmRegistrationRequest {
            host_id: created.host_id.clone(),
            key: created.key.clone(),
        }),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(confirmed.host_id, created.host_id);
    assert!(!confirmed.host_token.is_empty());

    // Replay answers the same error as any other bad credential.
    let err = registration_api::confirm_registration(
        State(state.clone()),
        source(),
        Json(ConfirmRegistrationRequest {
            host_id: created.host_id,
            key: created.key,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, FleetError::Authentication));

    let listed = registration_api::list_registrations(State(state))
        .await
        .unwrap()
        .0;
    assert!(!listed[0].active);
    assert_eq!(
        listed[0].activation_source_address.as_deref(),
        Some("127.0.0.1")
    );
}

#[tokio::test]
async fn confirm_is_rate_limited_per_source() {
    let mut state = test_state().await;
    state.confirm_limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        max_requests: 1,
        ..RateLimitConfig::default()
    }));

    let created = registration_api::create_registration(
        State(state.clone()),
        Extension(operator()),
        Json(create_request()),
    )
    .await
    .unwrap()
    .0;
    let good_request = || {
        Json(ConfirmRegistrationRequest {
            host_id: created.host_id.clone(),
            key: created.key.clone(),
        })
    };

    // A failed guess from this source spends its window.
    let first = registration_api::confirm_registration(
        State(state.clone()),
        source(),
        Json(ConfirmRegistrationRequest {
            host_id: created.host_id.clone(),
            key: "bogus".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(first, FleetError::Authentication));

    let limited =
        registration_api::confirm_registration(State(state.clone()), source(), good_request())
            .await
            .unwrap_err();
    assert!(matches!(limited, FleetError::RateLimited));

    // The limited attempt never reached the registration: the key is still
    // live and redeems from another source.
    let listed = registration_api::list_registrations(State(state.clone()))
        .await
        .unwrap()
        .0;
    assert!(listed[0].active);

    let confirmed =
        registration_api::confirm_registration(State(state), source_from(2), good_request())
            .await
            .unwrap()
            .0;
    assert_eq!(confirmed.host_id, created.host_id);
}

#[tokio::test]
async fn purge_abandoned_spares_confirmed_hosts() {
    let state = test_state().await;
    confirmed_host(&state).await;
    let abandoned = registration_api::create_registration(
        State(state.clone()),
        Extension(operator()),
        Json(create_request()),
    )
    .await
    .unwrap()
    .0;

    let purged = registration_api::purge_abandoned(
        State(state.clone()),
        Extension(operator()),
        Query(PurgeAbandonedQuery {
            timestamp: unix_timestamp() + 1,
        }),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(purged.registrations_removed, 1);
    assert_eq!(purged.hosts_removed, 1);

    // The confirmed registration stays for audit; the unredeemed one is gone.
    let listed = registration_api::list_registrations(State(state))
        .await
        .unwrap()
        .0;
    assert_eq!(listed.len(), 1);
    assert!(!listed[0].active);
    assert_ne!(listed[0].host_id, abandoned.host_id);
}
