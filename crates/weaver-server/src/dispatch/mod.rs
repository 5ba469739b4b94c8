//! Pull-based work dispatch.
//!
//! Operators enqueue commands for a host; the host drains them in FIFO
//! order through its check-ins and acknowledges each one by advancing its
//! status. Delivery never claims an item: until a host acknowledges, the
//! item keeps reappearing in every batch.

pub mod command;
pub mod status;

pub use command::{ConfigEntry, LifecycleAction, ServerAction, WorkCommand};
pub use status::WorkStatus;

use tracing::info;

use crate::actor::Actor;
use crate::error::FleetError;
use crate::storage::{DatabaseError, FleetDb, NewWorkParams, WorkItem};

#[derive(Clone)]
pub struct WorkDispatcher {
    db: FleetDb,
}

impl WorkDispatcher {
    pub const fn new(db: FleetDb) -> Self {
        Self { db }
    }

    /// Enqueue a command for a host. The host must exist and be operational.
    pub async fn create(
        &self,
        host_id: &str,
        command: &WorkCommand,
        actor: &Actor,
    ) -> Result<WorkItem, FleetError> {
        let host = self.db.get_host(host_id).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => FleetError::Validation(format!("Unknown host {host_id}")),
            other => other.into(),
        })?;

        if !host.is_confirmed() {
            return Err(FleetError::Validation(format!(
                "Host {host_id} has not confirmed its registration"
            )));
        }

        let work_data = serde_json::to_string(command)
            .map_err(|e| FleetError::System(format!("Command serialization failed: {e}")))?;

        let item = self
            .db
            .create_work_item(&NewWorkParams {
                host_id,
                target_type: command.target_type(),
                work_data: &work_data,
                audit: &actor.audit_id(),
            })
            .await?;

        info!(
            work_id = item.id,
            host_id = %host_id,
            target = command.target_type(),
            actor = %actor,
            "Work item enqueued"
        );

        Ok(item)
    }

    /// Oldest waiting items for a host, FIFO, capped at `limit`.
    pub async fn waiting_batch(&self, host_id: &str, limit: i64) -> Result<Vec<WorkItem>, FleetError> {
        Ok(self.db.waiting_work_batch(host_id, limit).await?)
    }

    /// Advance a work item's status on behalf of `actor`.
    ///
    /// Hosts only ever see their own items; an item belonging to another
    /// host answers `NotFound`, indistinguishable from an absent id. An
    /// illegal edge (or a lost race against a concurrent update) answers
    /// `InvalidTransition` and leaves the row untouched.
    pub async fn update_status(
        &self,
        work_id: i64,
        to: WorkStatus,
        result_data: Option<&str>,
        actor: &Actor,
    ) -> Result<WorkItem, FleetError> {
        let item = self.db.get_work_item(work_id).await?;

        if let Actor::Host(host_id) = actor {
            if item.host_id != *host_id {
                return Err(FleetError::NotFound(format!("Work item {work_id}")));
            }
        }

        let from = Self::stored_status(&item)?;
        if !from.can_transition(to, actor) {
            return Err(FleetError::InvalidTransition { from, to });
        }

        let advanced = self
            .db
            .try_advance_work_status(
                work_id,
                from.as_str(),
                to.as_str(),
                result_data,
                &actor.audit_id(),
            )
            .await?;

        if !advanced {
            // Lost the claim race: report against the status that stuck.
            let current = self.db.get_work_item(work_id).await?;
            let from = Self::stored_status(&current)?;
            return Err(FleetError::InvalidTransition { from, to });
        }

        info!(work_id, from = %from, to = %to, actor = %actor, "Work status updated");

        Ok(self.db.get_work_item(work_id).await?)
    }

    /// Diagnostics listing with optional host and status filters.
    pub async fn list(
        &self,
        host_id: Option<&str>,
        status: Option<WorkStatus>,
    ) -> Result<Vec<WorkItem>, FleetError> {
        Ok(self
            .db
            .list_work(host_id, status.map(WorkStatus::as_str))
            .await?)
    }

    /// Remove finished work created before `cutoff`. Items still queued or
    /// running survive regardless of age.
    pub async fn purge_older_than(&self, cutoff: i64, actor: &Actor) -> Result<u64, FleetError> {
        let removed = self.db.purge_terminal_work_before(cutoff).await?;

        if removed > 0 {
            info!(removed, cutoff, actor = %actor, "Purged finished work items");
        }

        Ok(removed)
    }

    fn stored_status(item: &WorkItem) -> Result<WorkStatus, FleetError> {
        WorkStatus::parse(&item.status).ok_or_else(|| {
            FleetError::System(format!("Unknown stored work status: {}", item.status))
        })
    }
}
