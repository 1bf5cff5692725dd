//! Lifecycle tracker — success/failure reporting and stale-run recovery.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::QueueError;
use crate::queue::TaskQueue;
use crate::task::TaskStatus;

impl TaskQueue {
    /// Record a successful run: `running → done`.
    ///
    /// A row found in `restart` instead was republished mid-run, so the
    /// result just produced is already stale — the task is reset to
    /// `created` and scheduled immediately for another run. An unknown id
    /// (batch-cancelled or already garbage-collected) is a benign no-op.
    pub async fn complete(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), QueueError> {
        self.settle(id, now, TaskStatus::Done).await
    }

    /// Record a failed run: `running → failed`. Same recovery and no-op
    /// rules as [`TaskQueue::complete`]; failures are not auto-retried.
    pub async fn fail(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), QueueError> {
        self.settle(id, now, TaskStatus::Failed).await
    }

    async fn settle(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        terminal: TaskStatus,
    ) -> Result<(), QueueError> {
        let id_str = id.to_string();
        let done_at = (terminal == TaskStatus::Done).then(|| now.timestamp());

        // Conditional on the expected prior status, so a concurrent
        // republish flipping the row to restart can never be overwritten
        // with a terminal state.
        let settled = sqlx::query(
            "UPDATE tasks SET status = ?1, done_at = ?2, updated_at = ?3
             WHERE id = ?4 AND status = 'running'",
        )
        .bind(terminal.as_str())
        .bind(done_at)
        .bind(now.timestamp())
        .bind(&id_str)
        .execute(self.pool())
        .await?
        .rows_affected();

        if settled > 0 {
            info!(task = %id, status = %terminal, "task settled");
            return Ok(());
        }

        let recycled = sqlx::query(
            "UPDATE tasks SET status = 'created', scheduled_at = ?1, done_at = NULL,
                    updated_at = ?1
             WHERE id = ?2 AND status = 'restart'",
        )
        .bind(now.timestamp())
        .bind(&id_str)
        .execute(self.pool())
        .await?
        .rows_affected();

        if recycled > 0 {
            info!(task = %id, "stale run discarded, task requeued");
        } else {
            debug!(task = %id, "settle for unknown or already-settled task ignored");
        }
        Ok(())
    }
}
