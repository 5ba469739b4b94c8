//! Host registry queries.
//!
//! Soft-deleted hosts are invisible to every query here except the delete
//! itself.

use weaver_core::unix_timestamp;

use super::db::{DatabaseError, FleetDb};
use super::models::Host;

/// Descriptor fields a host pushes about itself.
pub struct HostDetailsParams<'a> {
    pub hostname: &'a str,
    pub os: &'a str,
    pub cpu_info: &'a str,
    pub network_info: &'a str,
    pub storage_info: &'a str,
}

impl FleetDb {
    // =========================================================================
    // Host queries
    // =========================================================================

    /// Get a host by ID. Soft-deleted hosts are not found.
    pub async fn get_host(&self, id: &str) -> Result<Host, DatabaseError> {
        sqlx::query_as::<_, Host>("SELECT * FROM hosts WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Host {id}")))
    }

    /// List hosts, optionally filtered by state.
    pub async fn list_hosts(&self, state_filter: Option<&str>) -> Result<Vec<Host>, DatabaseError> {
        let hosts = if let Some(state) = state_filter {
            sqlx::query_as::<_, Host>(
                "SELECT * FROM hosts WHERE deleted_at IS NULL AND current_state = ? ORDER BY created_at ASC, id ASC",
            )
            .bind(state)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, Host>(
                "SELECT * FROM hosts WHERE deleted_at IS NULL ORDER BY created_at ASC, id ASC",
            )
            .fetch_all(self.pool())
            .await?
        };

        Ok(hosts)
    }

    /// Update operator-editable profile fields. `None` leaves a field as is.
    pub async fn update_host_profile(
        &self,
        id: &str,
        friendly_name: Option<&str>,
        description: Option<&str>,
        private_address: Option<&str>,
        public_address: Option<&str>,
        audit: &str,
    ) -> Result<Host, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE hosts SET friendly_name = COALESCE(?, friendly_name), description = COALESCE(?, description), private_address = COALESCE(?, private_address), public_address = COALESCE(?, public_address), modified_by = ?, modified_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(friendly_name)
        .bind(description)
        .bind(private_address)
        .bind(public_address)
        .bind(audit)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Host {id}")));
        }

        self.get_host(id).await
    }

    /// Replace the host-pushed descriptor fields.
    pub async fn update_host_details(
        &self,
        id: &str,
        params: &HostDetailsParams<'_>,
        audit: &str,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE hosts SET hostname = ?, os = ?, cpu_info = ?, network_info = ?, storage_info = ?, modified_by = ?, modified_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(params.hostname)
        .bind(params.os)
        .bind(params.cpu_info)
        .bind(params.network_info)
        .bind(params.storage_info)
        .bind(audit)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Host {id}")));
        }

        Ok(())
    }

    /// Soft-delete a host and hard-delete its queued work in one
    /// transaction. Returns the number of work rows dropped, or `None`
    /// if the host was already gone.
    pub async fn remove_host(&self, id: &str, audit: &str) -> Result<Option<u64>, DatabaseError> {
        let now = unix_timestamp();

        let mut tx = self.pool().begin().await?;

        let deleted = sqlx::query(
            "UPDATE hosts SET deleted_at = ?, modified_by = ?, modified_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(audit)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let work = sqlx::query("DELETE FROM weaver_work WHERE host_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(work.rows_affected()))
    }

    /// Flip `online` hosts whose last check-in predates `last_seen_before`
    /// to `offline`. Returns the number of hosts flipped.
    pub async fn mark_stale_hosts_offline(
        &self,
        last_seen_before: i64,
        audit: &str,
    ) -> Result<u64, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE hosts SET current_state = 'offline', modified_by = ?, modified_at = ? WHERE current_state = 'online' AND deleted_at IS NULL AND last_checkin_at < ?",
        )
        .bind(audit)
        .bind(now)
        .bind(last_seen_before)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }
}
