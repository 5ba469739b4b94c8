//! Check-in telemetry queries.

use super::db::{DatabaseError, FleetDb};
use super::models::HostCheckin;

/// Parameters for recording a check-in.
pub struct NewCheckinParams<'a> {
    pub host_id: &'a str,
    pub send_timestamp: i64,
    pub receive_timestamp: i64,
    pub cpu_usage: f64,
    pub ram_usage: f64,
    pub uptime_secs: i64,
    pub network_in_bytes: i64,
    pub network_out_bytes: i64,
}

impl FleetDb {
    // =========================================================================
    // Check-in queries
    // =========================================================================

    /// Append a check-in row and bump the host online in one transaction.
    pub async fn record_checkin(
        &self,
        params: &NewCheckinParams<'_>,
        audit: &str,
    ) -> Result<HostCheckin, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO host_checkins (host_id, send_timestamp, receive_timestamp, cpu_usage, ram_usage, uptime_secs, network_in_bytes, network_out_bytes) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.host_id)
        .bind(params.send_timestamp)
        .bind(params.receive_timestamp)
        .bind(params.cpu_usage)
        .bind(params.ram_usage)
        .bind(params.uptime_secs)
        .bind(params.network_in_bytes)
        .bind(params.network_out_bytes)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE hosts SET current_state = 'online', last_checkin_at = ?, modified_by = ?, modified_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(params.receive_timestamp)
        .bind(audit)
        .bind(params.receive_timestamp)
        .bind(params.host_id)
        .execute(&mut *tx)
        .await?;

        let id = inserted.last_insert_rowid();
        tx.commit().await?;

        self.get_checkin(id).await
    }

    /// Get a check-in by ID.
    pub async fn get_checkin(&self, id: i64) -> Result<HostCheckin, DatabaseError> {
        sqlx::query_as::<_, HostCheckin>("SELECT * FROM host_checkins WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Check-in {id}")))
    }

    /// Newest check-ins for a host, capped at `limit`.
    pub async fn list_checkins(
        &self,
        host_id: &str,
        limit: i64,
    ) -> Result<Vec<HostCheckin>, DatabaseError> {
        let checkins = sqlx::query_as::<_, HostCheckin>(
            "SELECT * FROM host_checkins WHERE host_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(host_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(checkins)
    }

    /// Remove check-ins received before `cutoff`, optionally for one host.
    pub async fn purge_checkins_before(
        &self,
        cutoff: i64,
        host_id: Option<&str>,
    ) -> Result<u64, DatabaseError> {
        let result = if let Some(host) = host_id {
            sqlx::query("DELETE FROM host_checkins WHERE receive_timestamp < ? AND host_id = ?")
                .bind(cutoff)
                .bind(host)
                .execute(self.pool())
                .await?
        } else {
            sqlx::query("DELETE FROM host_checkins WHERE receive_timestamp < ?")
                .bind(cutoff)
                .execute(self.pool())
                .await?
        };

        Ok(result.rows_affected())
    }
}
