//! Batch & retention manager — bulk cancellation and history cleanup.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use cumulus_core::BatchId;

use crate::error::QueueError;
use crate::queue::TaskQueue;
use crate::task::TaskStatus;

impl TaskQueue {
    /// Delete every non-running task of the batch. In-flight work is left
    /// to finish; its eventual `complete`/`fail` then lands on a row that
    /// may no longer exist, which the lifecycle tracker tolerates.
    ///
    /// Returns whether any row carried this batch id, so callers can 404 on
    /// an unknown batch.
    pub async fn cancel_batch(&self, batch_id: BatchId) -> Result<bool, QueueError> {
        let id = batch_id.to_string();
        let mut tx = self.pool().begin().await?;

        let known: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE batch_id = ?1)")
                .bind(&id)
                .fetch_one(&mut *tx)
                .await?;
        let removed = sqlx::query("DELETE FROM tasks WHERE batch_id = ?1 AND status != 'running'")
            .bind(&id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if known != 0 {
            info!(batch = %batch_id, removed, "batch cancelled");
        }
        Ok(known != 0)
    }

    /// Garbage-collect terminal rows older than the retention window.
    /// `done` rows age from `done_at`, `failed` rows from their last update;
    /// non-terminal rows are never touched. Returns the number removed.
    pub async fn clean_old_tasks(&self, now: DateTime<Utc>) -> Result<u64, QueueError> {
        let cutoff =
            (now - Duration::days(i64::from(self.policy().retention_days))).timestamp();
        let removed = sqlx::query(
            "DELETE FROM tasks
             WHERE (status = 'done' AND done_at < ?1)
                OR (status = 'failed' AND updated_at < ?1)",
        )
        .bind(cutoff)
        .execute(self.pool())
        .await?
        .rows_affected();

        if removed > 0 {
            info!(removed, "cleaned old tasks");
        }
        Ok(removed)
    }

    /// Number of rows with the given status, or all rows when `None`.
    pub async fn count(&self, status: Option<TaskStatus>) -> Result<i64, QueueError> {
        let count = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status = ?1")
                    .bind(status.as_str())
                    .fetch_one(self.pool())
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
                    .fetch_one(self.pool())
                    .await?
            }
        };
        Ok(count)
    }

    /// Delete every row. Test/ops utility.
    pub async fn clear(&self) -> Result<(), QueueError> {
        sqlx::query("DELETE FROM tasks").execute(self.pool()).await?;
        Ok(())
    }
}
