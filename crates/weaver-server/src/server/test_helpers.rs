//! Shared fixtures for API handler tests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{ConnectInfo, State};

use crate::auth::{Claims, JwtManager, OperatorKeyring};
use crate::checkin::CheckinProcessor;
use crate::directory::AccountDirectory;
use crate::dispatch::WorkDispatcher;
use crate::ratelimit::{RateLimitConfig, RateLimiter};
use crate::registration::RegistrationManager;
use crate::registry::HostRegistry;
use crate::server::auth_layer::AuthIdentity;
use crate::server::registration_api::{self, ConfirmRegistrationRequest, CreateRegistrationRequest};
use crate::server::router::AppState;
use crate::storage::FleetDb;
use crate::token::TokenIssuer;

pub const TEST_OPERATOR_KEY: &str = "test-operator-key";

pub async fn test_state() -> AppState {
    let db = FleetDb::open_in_memory().await.unwrap();
    let jwt = Arc::new(JwtManager::new(b"test-secret", 3600));
    let directory = AccountDirectory::new([("u1".to_string(), "Alice".to_string())]);
    let dispatcher = WorkDispatcher::new(db.clone());

    AppState {
        registrations: RegistrationManager::new(
            db.clone(),
            directory,
            "https://fleet.test".to_string(),
        ),
        registry: HostRegistry::new(db.clone()),
        tokens: TokenIssuer::new(db.clone(), Arc::clone(&jwt)),
        checkins: CheckinProcessor::new(db.clone(), dispatcher.clone(), 10),
        dispatcher,
        jwt,
        operators: Arc::new(OperatorKeyring::new([(
            "ops".to_string(),
            TEST_OPERATOR_KEY.to_string(),
        )])),
        confirm_limiter: Arc::new(RateLimiter::new(RateLimitConfig::default())),
    }
}

pub fn operator() -> AuthIdentity {
    AuthIdentity::Operator("ops".to_string())
}

pub fn host_identity(host_id: &str) -> AuthIdentity {
    AuthIdentity::Host(Claims {
        jti: "test-jti".to_string(),
        sub: host_id.to_string(),
        iat: 0,
        exp: i64::MAX,
        token_type: "host".to_string(),
    })
}

pub fn source() -> ConnectInfo<SocketAddr> {
    source_from(1)
}

pub fn source_from(last_octet: u8) -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([127, 0, 0, last_octet], 40000)))
}

/// Register and confirm a host through the handlers, returning
/// `(host_id, credential)`.
pub async fn confirmed_host(state: &AppState) -> (String, String) {
    let created = registration_api::create_registration(
        State(state.clone()),
        axum::Extension(operator()),
        Json(CreateRegistrationRequest {
            description: "test host".to_string(),
            owner_id: "u1".to_string(),
        }),
    )
    .await
    .unwrap()
    .0;

    let confirmed = registration_api::confirm_registration(
        State(state.clone()),
        source(),
        Json(ConfirmRegistrationRequest {
            host_id: created.host_id,
            key: created.key,
        }),
    )
    .await
    .unwrap()
    .0;

    (confirmed.host_id, confirmed.host_token)
}
