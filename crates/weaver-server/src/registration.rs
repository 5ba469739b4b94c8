//! Registration bootstrap: one-time keys and credential installation.
//!
//! An operator generates a registration for a future host and hands the
//! one-time key out of band to whoever provisions the machine. The host
//! redeems the key exactly once at `confirm` and receives its durable
//! credential. Only digests of keys and credentials are ever stored.

use tracing::{info, warn};

use crate::actor::Actor;
use crate::auth::credential;
use crate::directory::AccountDirectory;
use crate::error::FleetError;
use crate::storage::{FleetDb, HostRegistration, NewRegistrationParams};

#[derive(Clone)]
pub struct RegistrationManager {
    db: FleetDb,
    directory: AccountDirectory,
    public_url: String,
}

/// Outcome of `generate`. `key` is shown exactly once and is not
/// recoverable afterwards.
#[derive(Debug, Clone)]
pub struct GeneratedRegistration {
    pub registration_id: String,
    pub host_id: String,
    pub key: String,
    pub confirmation_url: String,
}

/// Outcome of `confirm`. `credential` is shown exactly once.
#[derive(Debug, Clone)]
pub struct ConfirmedRegistration {
    pub host_id: String,
    pub credential: String,
}

impl RegistrationManager {
    pub fn new(db: FleetDb, directory: AccountDirectory, public_url: String) -> Self {
        Self {
            db,
            directory,
            public_url,
        }
    }

    /// Create a registration and its `unregistered` host row, returning the
    /// one-time key.
    pub async fn generate(
        &self,
        description: &str,
        owner_id: &str,
        actor: &Actor,
    ) -> Result<GeneratedRegistration, FleetError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(FleetError::Validation("Description must not be empty".into()));
        }
        if !self.directory.contains(owner_id) {
            return Err(FleetError::Validation(format!("Unknown owner {owner_id}")));
        }

        let registration_id = uuid::Uuid::new_v4().to_string();
        let host_id = uuid::Uuid::new_v4().to_string();
        let key = credential::generate_secret();

        self.db
            .create_registration(&NewRegistrationParams {
                registration_id: &registration_id,
                host_id: &host_id,
                owner_id,
                description,
                key_hash: &credential::key_digest(&key),
                audit: &actor.audit_id(),
            })
            .await?;

        info!(
            registration_id = %registration_id,
            host_id = %host_id,
            owner_id = %owner_id,
            "Registration generated"
        );

        Ok(GeneratedRegistration {
            registration_id,
            host_id,
            key,
            confirmation_url: format!("{}/registrations/confirm", self.public_url),
        })
    }

    /// Redeem a one-time key and install the host credential.
    ///
    /// Every failure mode answers the same `Authentication` error so the
    /// endpoint cannot be used to probe for valid host ids or keys.
    pub async fn confirm(
        &self,
        host_id: &str,
        key: &str,
        source_address: &str,
    ) -> Result<ConfirmedRegistration, FleetError> {
        let host_credential = credential::generate_secret();
        let credential_hash = credential::hash_credential(&host_credential)
            .map_err(|e| FleetError::System(format!("Credential hashing failed: {e}")))?;

        let confirmed = self
            .db
            .confirm_registration(
                host_id,
                &credential::key_digest(key),
                source_address,
                &credential_hash,
                &Actor::Host(host_id.to_string()).audit_id(),
            )
            .await?;

        if !confirmed {
            warn!(host_id = %host_id, source = %source_address, "Failed confirmation attempt");
            return Err(FleetError::Authentication);
        }

        info!(host_id = %host_id, source = %source_address, "Registration confirmed");

        Ok(ConfirmedRegistration {
            host_id: host_id.to_string(),
            credential: host_credential,
        })
    }

    /// Operator view of bootstrap state. Key digests stay server-side;
    /// callers render views without `key_hash`.
    pub async fn list(&self) -> Result<Vec<HostRegistration>, FleetError> {
        Ok(self.db.list_registrations().await?)
    }

    /// Hard-delete unconfirmed registrations older than `older_than` and
    /// their never-confirmed hosts. Returns `(registrations, hosts)` removed.
    pub async fn purge_abandoned(
        &self,
        older_than: i64,
        actor: &Actor,
    ) -> Result<(u64, u64), FleetError> {
        let (regs, hosts) = self.db.purge_abandoned_registrations(older_than).await?;

        if regs > 0 {
            info!(
                registrations = regs,
                hosts,
                actor = %actor,
                "Purged abandoned registrations"
            );
        }

        Ok((regs, hosts))
    }
}
