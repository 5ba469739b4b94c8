//! Registration bootstrap queries.

use weaver_core::unix_timestamp;

use super::db::{DatabaseError, FleetDb};
use super::models::HostRegistration;

/// Parameters for creating a registration together with its host row.
pub struct NewRegistrationParams<'a> {
    pub registration_id: &'a str,
    pub host_id: &'a str,
    pub owner_id: &'a str,
    pub description: &'a str,
    pub key_hash: &'a str,
    pub audit: &'a str,
}

impl FleetDb {
    // =========================================================================
    // Registration queries
    // =========================================================================

    /// Create an `unregistered` host row and its active registration in one
    /// transaction.
    pub async fn create_registration(
        &self,
        params: &NewRegistrationParams<'_>,
    ) -> Result<HostRegistration, DatabaseError> {
        let now = unix_timestamp();

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO hosts (id, owner_id, description, created_by, created_at, modified_by, modified_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.host_id)
        .bind(params.owner_id)
        .bind(params.description)
        .bind(params.audit)
        .bind(now)
        .bind(params.audit)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO host_registrations (id, host_id, description, key_hash, created_by, created_at, modified_by, modified_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.registration_id)
        .bind(params.host_id)
        .bind(params.description)
        .bind(params.key_hash)
        .bind(params.audit)
        .bind(now)
        .bind(params.audit)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_registration(params.registration_id).await
    }

    /// Get a registration by ID.
    pub async fn get_registration(&self, id: &str) -> Result<HostRegistration, DatabaseError> {
        sqlx::query_as::<_, HostRegistration>("SELECT * FROM host_registrations WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Registration {id}")))
    }

    /// List all registrations, newest first.
    pub async fn list_registrations(&self) -> Result<Vec<HostRegistration>, DatabaseError> {
        let regs = sqlx::query_as::<_, HostRegistration>(
            "SELECT * FROM host_registrations ORDER BY created_at DESC, id ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(regs)
    }

    /// Atomically redeem a one-time key and install the host credential.
    ///
    /// Returns `false` without changing anything when no active registration
    /// matches `(host_id, key_hash)` or the host row is gone. Unknown host,
    /// wrong key, and already-confirmed all land on the same `false`.
    pub async fn confirm_registration(
        &self,
        host_id: &str,
        key_hash: &str,
        source_address: &str,
        credential_hash: &str,
        audit: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let mut tx = self.pool().begin().await?;

        let claimed = sqlx::query(
            "UPDATE host_registrations SET active = 0, activation_timestamp = ?, activation_source_address = ?, modified_by = ?, modified_at = ? WHERE host_id = ? AND key_hash = ? AND active = 1",
        )
        .bind(now)
        .bind(source_address)
        .bind(audit)
        .bind(now)
        .bind(host_id)
        .bind(key_hash)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let upgraded = sqlx::query(
            "UPDATE hosts SET credential_hash = ?, current_state = 'registered', modified_by = ?, modified_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(credential_hash)
        .bind(audit)
        .bind(now)
        .bind(host_id)
        .execute(&mut *tx)
        .await?;

        if upgraded.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Hard-delete unconfirmed registrations created before `older_than`
    /// together with their never-confirmed host rows.
    ///
    /// Returns `(registrations, hosts)` removed.
    pub async fn purge_abandoned_registrations(
        &self,
        older_than: i64,
    ) -> Result<(u64, u64), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let regs = sqlx::query("DELETE FROM host_registrations WHERE active = 1 AND created_at < ?")
            .bind(older_than)
            .execute(&mut *tx)
            .await?;

        // Unregistered hosts whose only registration was just removed.
        let hosts = sqlx::query(
            "DELETE FROM hosts WHERE current_state = 'unregistered' AND id NOT IN (SELECT host_id FROM host_registrations)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((regs.rows_affected(), hosts.rows_affected()))
    }
}
