//! Host registry: lookups, operator edits, descriptor pushes, removal,
//! and the liveness flip for stale hosts.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::actor::Actor;
use crate::error::FleetError;
use crate::storage::{DatabaseError, FleetDb, Host, HostDetailsParams};

/// Lifecycle state of a host row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostState {
    Unregistered,
    Registered,
    Online,
    Offline,
}

impl HostState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unregistered => "unregistered",
            Self::Registered => "registered",
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unregistered" => Some(Self::Unregistered),
            "registered" => Some(Self::Registered),
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-editable host fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct HostPatch {
    pub friendly_name: Option<String>,
    pub description: Option<String>,
    pub private_address: Option<String>,
    pub public_address: Option<String>,
}

/// Descriptor a host pushes about itself.
#[derive(Debug, Clone)]
pub struct HostDetails {
    pub hostname: String,
    pub os: String,
    pub cpu_info: String,
    pub network_info: String,
    pub storage_info: String,
}

#[derive(Clone)]
pub struct HostRegistry {
    db: FleetDb,
}

impl HostRegistry {
    pub const fn new(db: FleetDb) -> Self {
        Self { db }
    }

    /// Get a host. Soft-deleted hosts answer `NotFound`.
    pub async fn get(&self, host_id: &str) -> Result<Host, FleetError> {
        Ok(self.db.get_host(host_id).await?)
    }

    /// List hosts, optionally by state.
    pub async fn list(&self, state: Option<HostState>) -> Result<Vec<Host>, FleetError> {
        Ok(self.db.list_hosts(state.map(HostState::as_str)).await?)
    }

    /// Apply an operator edit.
    pub async fn update(
        &self,
        host_id: &str,
        patch: &HostPatch,
        actor: &Actor,
    ) -> Result<Host, FleetError> {
        let host = self
            .db
            .update_host_profile(
                host_id,
                patch.friendly_name.as_deref(),
                patch.description.as_deref(),
                patch.private_address.as_deref(),
                patch.public_address.as_deref(),
                &actor.audit_id(),
            )
            .await?;

        info!(host_id = %host_id, actor = %actor, "Host profile updated");

        Ok(host)
    }

    /// Store a host-pushed descriptor.
    ///
    /// The caller's token already checked out, so a missing row means the
    /// host was removed since; that answers `Authentication`, not
    /// `NotFound`.
    pub async fn submit_details(
        &self,
        host_id: &str,
        details: &HostDetails,
    ) -> Result<(), FleetError> {
        let actor = Actor::Host(host_id.to_string());

        self.db
            .update_host_details(
                host_id,
                &HostDetailsParams {
                    hostname: &details.hostname,
                    os: &details.os,
                    cpu_info: &details.cpu_info,
                    network_info: &details.network_info,
                    storage_info: &details.storage_info,
                },
                &actor.audit_id(),
            )
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => FleetError::Authentication,
                other => other.into(),
            })?;

        info!(host_id = %host_id, hostname = %details.hostname, "Host details updated");

        Ok(())
    }

    /// Soft-delete a host and drop its queued work in one transaction.
    pub async fn remove(&self, host_id: &str, actor: &Actor) -> Result<(), FleetError> {
        let Some(work_removed) = self.db.remove_host(host_id, &actor.audit_id()).await? else {
            return Err(FleetError::NotFound(format!("Host {host_id}")));
        };

        info!(
            host_id = %host_id,
            work_removed,
            actor = %actor,
            "Host removed"
        );

        Ok(())
    }

    /// Flip `online` hosts not seen since `last_seen_before` to `offline`.
    pub async fn mark_stale_offline(
        &self,
        last_seen_before: i64,
        actor: &Actor,
    ) -> Result<u64, FleetError> {
        let flipped = self
            .db
            .mark_stale_hosts_offline(last_seen_before, &actor.audit_id())
            .await?;

        if flipped > 0 {
            info!(flipped, actor = %actor, "Marked stale hosts offline");
        }

        Ok(flipped)
    }
}
