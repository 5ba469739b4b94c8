//! Access token issuance against the stored host credential.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::credential;
use crate::auth::jwt::JwtManager;
use crate::error::FleetError;
use crate::storage::{DatabaseError, FleetDb};

#[derive(Clone)]
pub struct TokenIssuer {
    db: FleetDb,
    jwt: Arc<JwtManager>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

impl TokenIssuer {
    pub fn new(db: FleetDb, jwt: Arc<JwtManager>) -> Self {
        Self { db, jwt }
    }

    /// Exchange a host credential for a short-lived access token.
    ///
    /// Unknown host, unconfirmed host, deleted host, and wrong credential
    /// all answer the same `Authentication` error.
    pub async fn issue(&self, host_id: &str, presented: &str) -> Result<IssuedToken, FleetError> {
        let host = self.db.get_host(host_id).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => FleetError::Authentication,
            other => other.into(),
        })?;

        let Some(stored_hash) = host.credential_hash.as_deref() else {
            warn!(host_id = %host_id, "Token request for unconfirmed host");
            return Err(FleetError::Authentication);
        };

        let valid = credential::verify_credential(presented, stored_hash)
            .map_err(|e| FleetError::System(format!("Credential verification failed: {e}")))?;

        if !valid {
            warn!(host_id = %host_id, "Failed token request");
            return Err(FleetError::Authentication);
        }

        let (token, expires_at) = self
            .jwt
            .issue_host_token(host_id)
            .map_err(|e| FleetError::System(format!("Token creation failed: {e}")))?;

        info!(host_id = %host_id, expires_at, "Access token issued");

        Ok(IssuedToken { token, expires_at })
    }
}
