//! Authentication middleware for HTTP requests.
//!
//! Each layer validates the bearer credential and stashes an
//! [`AuthIdentity`] in the request extensions for handlers to read.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::actor::Actor;
use crate::auth::Claims;
use crate::error::FleetError;
use crate::server::router::AppState;

/// Authenticated caller attached to a request.
#[derive(Debug, Clone)]
pub enum AuthIdentity {
    /// Operator authenticated by API key; carries the key's name.
    Operator(String),
    /// Host authenticated by access token; carries the validated claims.
    Host(Claims),
}

impl AuthIdentity {
    pub fn actor(&self) -> Actor {
        match self {
            Self::Operator(name) => Actor::Operator(name.clone()),
            Self::Host(claims) => Actor::Host(claims.sub.clone()),
        }
    }

    /// Host id when the caller is a host.
    pub fn host_id(&self) -> Option<&str> {
        match self {
            Self::Host(claims) => Some(&claims.sub),
            Self::Operator(_) => None,
        }
    }
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(ToString::to_string)
}

/// Require an operator API key.
pub async fn require_operator(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, FleetError> {
    let token = bearer_token(&req).ok_or(FleetError::Authentication)?;

    let Some(name) = state.operators.authenticate(&token) else {
        warn!(path = %req.uri().path(), "Rejected operator request");
        return Err(FleetError::Authentication);
    };

    req.extensions_mut()
        .insert(AuthIdentity::Operator(name.to_string()));
    Ok(next.run(req).await)
}

/// Require a host access token.
pub async fn require_host_token(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, FleetError> {
    let token = bearer_token(&req).ok_or(FleetError::Authentication)?;

    let claims = state.jwt.validate(&token).map_err(|e| {
        warn!(path = %req.uri().path(), error = %e, "Rejected host token");
        FleetError::Authentication
    })?;
    if !claims.is_host() {
        return Err(FleetError::Authentication);
    }

    req.extensions_mut().insert(AuthIdentity::Host(claims));
    Ok(next.run(req).await)
}

/// Accept either an operator API key or a host access token.
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, FleetError> {
    let token = bearer_token(&req).ok_or(FleetError::Authentication)?;

    let identity = if let Some(name) = state.operators.authenticate(&token) {
        AuthIdentity::Operator(name.to_string())
    } else {
        let claims = state.jwt.validate(&token).map_err(|e| {
            warn!(path = %req.uri().path(), error = %e, "Rejected bearer credential");
            FleetError::Authentication
        })?;
        if !claims.is_host() {
            return Err(FleetError::Authentication);
        }
        AuthIdentity::Host(claims)
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
