//! Work queue queries.
//!
//! `weaver_work.id` is an AUTOINCREMENT rowid: ascending id order is the
//! FIFO delivery order, and ids are never reused.

use weaver_core::unix_timestamp;

use super::db::{DatabaseError, FleetDb};
use super::models::WorkItem;

/// Parameters for enqueuing a work item.
pub struct NewWorkParams<'a> {
    pub host_id: &'a str,
    pub target_type: &'a str,
    pub work_data: &'a str,
    pub audit: &'a str,
}

impl FleetDb {
    // =========================================================================
    // Work queue queries
    // =========================================================================

    /// Enqueue a work item in `waiting` state; returns the stored row.
    pub async fn create_work_item(
        &self,
        params: &NewWorkParams<'_>,
    ) -> Result<WorkItem, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "INSERT INTO weaver_work (host_id, target_type, status, work_data, created_by, created_at, modified_by, modified_at) VALUES (?, ?, 'waiting', ?, ?, ?, ?, ?)",
        )
        .bind(params.host_id)
        .bind(params.target_type)
        .bind(params.work_data)
        .bind(params.audit)
        .bind(now)
        .bind(params.audit)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_work_item(result.last_insert_rowid()).await
    }

    /// Get a work item by ID.
    pub async fn get_work_item(&self, id: i64) -> Result<WorkItem, DatabaseError> {
        sqlx::query_as::<_, WorkItem>("SELECT * FROM weaver_work WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Work item {id}")))
    }

    /// Oldest `waiting` items for a host, ascending id, capped at `limit`.
    ///
    /// Items are NOT claimed by this read; a host acknowledges each item
    /// through `try_advance_work_status`, so unacknowledged items reappear
    /// in the next batch.
    pub async fn waiting_work_batch(
        &self,
        host_id: &str,
        limit: i64,
    ) -> Result<Vec<WorkItem>, DatabaseError> {
        let items = sqlx::query_as::<_, WorkItem>(
            "SELECT * FROM weaver_work WHERE host_id = ? AND status = 'waiting' ORDER BY id ASC LIMIT ?",
        )
        .bind(host_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(items)
    }

    /// List work items with optional host and status filters, ascending id.
    pub async fn list_work(
        &self,
        host_id: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<WorkItem>, DatabaseError> {
        let items = match (host_id, status) {
            (Some(host), Some(status)) => {
                sqlx::query_as::<_, WorkItem>(
                    "SELECT * FROM weaver_work WHERE host_id = ? AND status = ? ORDER BY id ASC",
                )
                .bind(host)
                .bind(status)
                .fetch_all(self.pool())
                .await?
            }
            (Some(host), None) => {
                sqlx::query_as::<_, WorkItem>(
                    "SELECT * FROM weaver_work WHERE host_id = ? ORDER BY id ASC",
                )
                .bind(host)
                .fetch_all(self.pool())
                .await?
            }
            (None, Some(status)) => {
                sqlx::query_as::<_, WorkItem>(
                    "SELECT * FROM weaver_work WHERE status = ? ORDER BY id ASC",
                )
                .bind(status)
                .fetch_all(self.pool())
                .await?
            }
            (None, None) => {
                sqlx::query_as::<_, WorkItem>("SELECT * FROM weaver_work ORDER BY id ASC")
                    .fetch_all(self.pool())
                    .await?
            }
        };

        Ok(items)
    }

    /// Compare-and-set status advance.
    ///
    /// Returns `false` when the row is no longer in `from` (or never
    /// existed); the row is left untouched. A stale retry loses here.
    pub async fn try_advance_work_status(
        &self,
        id: i64,
        from: &str,
        to: &str,
        result_data: Option<&str>,
        audit: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE weaver_work SET status = ?, result_data = COALESCE(?, result_data), modified_by = ?, modified_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to)
        .bind(result_data)
        .bind(audit)
        .bind(now)
        .bind(id)
        .bind(from)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove finished work created before `cutoff`. Queued or running items
    /// are never touched regardless of age.
    pub async fn purge_terminal_work_before(&self, cutoff: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM weaver_work WHERE status IN ('completed', 'cancelled', 'failed') AND created_at < ?",
        )
        .bind(cutoff)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }
}
