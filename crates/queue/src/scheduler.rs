//! Scheduler — atomically claims the best eligible task.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::QueueError;
use crate::queue::TaskQueue;
use crate::task::Task;

impl TaskQueue {
    /// Claim the single best runnable task, or `None` when nothing is due.
    ///
    /// Eligible tasks are `created` rows whose `scheduled_at` has passed and
    /// whose conflict resource `(site, date, product)` has no running row.
    /// Candidates are ranked by effective score — `priority` minus an aging
    /// boost that grows with waiting time up to the configured cap — so an
    /// old low-priority task eventually outranks a fresh high-priority one.
    /// Lower score wins; ties go to the earliest `scheduled_at`.
    ///
    /// Selection and the `created → running` flip happen in one statement,
    /// so two schedulers racing for the same row never both succeed: the
    /// loser simply claims a different task or sees an empty queue. Callers
    /// run their own poll/backoff loop around this.
    pub async fn receive(&self, now: DateTime<Utc>) -> Result<Option<Task>, QueueError> {
        let claimed = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET status = 'running', updated_at = ?1
             WHERE id = (
                 SELECT c.id FROM tasks c
                 WHERE c.status = 'created' AND c.scheduled_at <= ?1
                   AND NOT EXISTS (
                       SELECT 1 FROM tasks r
                       WHERE r.status = 'running'
                         AND r.site_id = c.site_id
                         AND r.measurement_date = c.measurement_date
                         AND r.product_id = c.product_id
                   )
                 ORDER BY c.priority - MIN(?2, (?1 - c.scheduled_at) * ?2 / ?3) ASC,
                          c.scheduled_at ASC
                 LIMIT 1
             )
             RETURNING *",
        )
        .bind(now.timestamp())
        .bind(self.policy().aging_max_boost)
        .bind(self.policy().aging_window_seconds())
        .fetch_optional(self.pool())
        .await?;

        if let Some(task) = &claimed {
            info!(
                task = %task.id,
                task_type = %task.task_type,
                site = %task.site_id,
                product = %task.product_id,
                date = %task.measurement_date,
                priority = task.priority,
                "task claimed"
            );
        }
        Ok(claimed)
    }
}
