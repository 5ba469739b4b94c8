//! Check-in processing: telemetry ingest plus work delivery in the
//! same exchange.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::actor::Actor;
use crate::dispatch::WorkDispatcher;
use crate::error::FleetError;
use crate::storage::{DatabaseError, FleetDb, HostCheckin, NewCheckinParams, WorkItem};
use weaver_core::unix_timestamp;

/// Telemetry sample a host reports about itself.
///
/// `send_timestamp` is the host's clock and is stored verbatim; ordering
/// and retention always use the server-side receive timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub send_timestamp: i64,
    pub cpu_usage: f64,
    pub ram_usage: f64,
    pub uptime_secs: i64,
    pub network_in_bytes: i64,
    pub network_out_bytes: i64,
}

#[derive(Clone)]
pub struct CheckinProcessor {
    db: FleetDb,
    dispatcher: WorkDispatcher,
    batch_limit: i64,
}

impl CheckinProcessor {
    pub const fn new(db: FleetDb, dispatcher: WorkDispatcher, batch_limit: i64) -> Self {
        Self {
            db,
            dispatcher,
            batch_limit,
        }
    }

    /// Record one telemetry sample and hand back the host's waiting work.
    ///
    /// The sample also bumps the host to `online` and refreshes its
    /// last-seen timestamp. Hosts that were removed since their token was
    /// issued answer `Authentication`.
    pub async fn check_in(
        &self,
        host_id: &str,
        report: &TelemetryReport,
    ) -> Result<Vec<WorkItem>, FleetError> {
        let host = self.db.get_host(host_id).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => FleetError::Authentication,
            other => other.into(),
        })?;
        if !host.is_confirmed() {
            warn!(host_id = %host_id, "Check-in from unconfirmed host");
            return Err(FleetError::Authentication);
        }

        let actor = Actor::Host(host_id.to_string());
        let checkin = self
            .db
            .record_checkin(
                &NewCheckinParams {
                    host_id,
                    send_timestamp: report.send_timestamp,
                    receive_timestamp: unix_timestamp(),
                    cpu_usage: report.cpu_usage,
                    ram_usage: report.ram_usage,
                    uptime_secs: report.uptime_secs,
                    network_in_bytes: report.network_in_bytes,
                    network_out_bytes: report.network_out_bytes,
                },
                &actor.audit_id(),
            )
            .await?;

        let batch = self.dispatcher.waiting_batch(host_id, self.batch_limit).await?;

        info!(
            host_id = %host_id,
            checkin_id = checkin.id,
            delivered = batch.len(),
            "Check-in processed"
        );

        Ok(batch)
    }

    /// Most recent samples for a host, newest first.
    pub async fn recent(&self, host_id: &str, limit: i64) -> Result<Vec<HostCheckin>, FleetError> {
        // Distinguish "no samples yet" from "no such host".
        self.db.get_host(host_id).await?;
        Ok(self.db.list_checkins(host_id, limit).await?)
    }

    /// Drop samples received before `cutoff`, optionally for one host.
    pub async fn purge_older_than(
        &self,
        cutoff: i64,
        host_id: Option<&str>,
        actor: &Actor,
    ) -> Result<u64, FleetError> {
        let removed = self.db.purge_checkins_before(cutoff, host_id).await?;

        if removed > 0 {
            info!(removed, cutoff, actor = %actor, "Purged old check-ins");
        }

        Ok(removed)
    }
}
