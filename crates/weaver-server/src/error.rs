//! Error taxonomy for the control plane.
//!
//! Every component returns `FleetError`; the HTTP layer maps each variant to
//! a status code and a JSON body. `System` details are logged server-side
//! and never echoed to the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::dispatch::WorkStatus;
use crate::storage::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Deliberately carries no cause: callers must not be able to tell an
    /// unknown host from a wrong key or an already-used registration.
    #[error("Authentication failed")]
    Authentication,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid work transition: {from} -> {to}")]
    InvalidTransition { from: WorkStatus, to: WorkStatus },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    System(String),
}

impl FleetError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::System(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error kind for the response body.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Authentication => "authentication",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition { .. } => "invalid_state_transition",
            Self::Conflict(_) => "conflict",
            Self::RateLimited => "rate_limited",
            Self::System(_) => "system",
        }
    }
}

impl From<DatabaseError> for FleetError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::System(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for FleetError {
    fn into_response(self) -> Response {
        let message = if let Self::System(detail) = &self {
            error!(detail = %detail, "Internal error");
            "Internal error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: self.kind(),
            message,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            FleetError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FleetError::Authentication.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            FleetError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            FleetError::InvalidTransition {
                from: WorkStatus::Waiting,
                to: WorkStatus::Completed,
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            FleetError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            FleetError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            FleetError::System("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn authentication_message_carries_no_cause() {
        assert_eq!(FleetError::Authentication.to_string(), "Authentication failed");
    }

    #[test]
    fn database_not_found_maps_to_not_found() {
        let e: FleetError = DatabaseError::NotFound("Host h1".into()).into();
        assert!(matches!(e, FleetError::NotFound(_)));

        let e: FleetError = DatabaseError::Query("boom".into()).into();
        assert!(matches!(e, FleetError::System(_)));
    }
}
