//! Publisher — idempotent task submission.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::QueueError;
use crate::queue::TaskQueue;
use crate::task::{TaskDescriptor, TaskStatus};

impl TaskQueue {
    /// Insert the task, or coalesce it with the existing row for the same
    /// identity key.
    ///
    /// Coalescing merges `priority` to the more urgent of the two values and
    /// moves `status` through [`TaskStatus::on_republish`]; ten rapid
    /// republishes of an identical task therefore collapse into one row and
    /// one effective schedule. Republishing is always safe to retry.
    pub async fn publish(&self, task: &TaskDescriptor) -> Result<(), QueueError> {
        let now = Utc::now();
        let options = task.options.clone().unwrap_or_default();
        let options_json = serde_json::to_string(&options)?;
        let scheduled_at = task.scheduled_at.unwrap_or(now).timestamp();
        let batch_id = task.batch_id.map(|b| b.to_string());
        let measurement_date = task.measurement_date.to_string();

        let mut tx = self.pool().begin().await?;

        let existing = sqlx::query_as::<_, (String, String, i64, i64)>(
            "SELECT id, status, priority, scheduled_at FROM tasks
             WHERE task_type = ?1 AND site_id = ?2 AND measurement_date = ?3
               AND product_id = ?4 AND instrument_id IS ?5 AND model_id IS ?6
               AND options = ?7",
        )
        .bind(task.task_type.as_str())
        .bind(&task.site_id)
        .bind(&measurement_date)
        .bind(&task.product_id)
        .bind(&task.instrument_id)
        .bind(&task.model_id)
        .bind(&options_json)
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some((id, status, priority, existing_scheduled_at)) => {
                let status: TaskStatus = status.parse()?;
                let next_status = status.on_republish();
                let priority = priority.min(task.priority);
                // A revived terminal row is rescheduled fresh; a pending one
                // keeps its earliest slot so accumulated age never resets.
                let scheduled_at = if status.is_terminal() {
                    scheduled_at
                } else {
                    existing_scheduled_at.min(scheduled_at)
                };
                sqlx::query(
                    "UPDATE tasks SET status = ?1, priority = ?2, scheduled_at = ?3,
                            done_at = NULL, batch_id = ?4, updated_at = ?5
                     WHERE id = ?6",
                )
                .bind(next_status.as_str())
                .bind(priority)
                .bind(scheduled_at)
                .bind(&batch_id)
                .bind(now.timestamp())
                .bind(&id)
                .execute(&mut *tx)
                .await?;
                debug!(task = %id, status = %next_status, "coalesced republished task");
            }
            None => {
                let id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO tasks (id, task_type, site_id, product_id, measurement_date,
                                        instrument_id, model_id, options, status, priority,
                                        scheduled_at, done_at, batch_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL, ?12, ?13, ?13)",
                )
                .bind(id.to_string())
                .bind(task.task_type.as_str())
                .bind(&task.site_id)
                .bind(&task.product_id)
                .bind(&measurement_date)
                .bind(&task.instrument_id)
                .bind(&task.model_id)
                .bind(&options_json)
                .bind(TaskStatus::Created.as_str())
                .bind(task.priority)
                .bind(scheduled_at)
                .bind(&batch_id)
                .bind(now.timestamp())
                .execute(&mut *tx)
                .await?;
                debug!(
                    task = %id,
                    task_type = %task.task_type,
                    site = %task.site_id,
                    product = %task.product_id,
                    date = %measurement_date,
                    "queued new task"
                );
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
