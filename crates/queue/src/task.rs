//! Task record model — the persisted unit of (potentially recurring) work.
//!
//! Two independent keys govern a task row:
//!
//! - **Identity key** `(type, site, date, product, instrument, model, options)`
//!   decides which publish calls coalesce into one row.
//! - **Conflict resource key** `(site, date, product)` — deliberately coarser —
//!   decides which tasks exclude each other at run time: a `process` and a
//!   `freeze` for the same coordinate would race on the same output file, and
//!   two model variants may not both be the "best" model at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use cumulus_core::{BatchId, InstrumentId, MeasurementDate, ModelId, ProductId, SiteId, TaskType};

// ── Status ───────────────────────────────────────────────────────────

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting to be claimed.
    Created,
    /// Claimed by a worker.
    Running,
    /// Republished while running — the in-flight run is already stale and
    /// the task goes back to `created` once that run reports in.
    Restart,
    /// Finished successfully (terminal).
    Done,
    /// Finished unsuccessfully (terminal, kept for diagnostics, not retried).
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::Running => "running",
            TaskStatus::Restart => "restart",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// Status a row moves to when its identity is published again.
    ///
    /// This transition table is the coalescing contract: pending rows stay
    /// pending, an in-flight run is flagged stale, terminal rows are revived.
    pub fn on_republish(self) -> TaskStatus {
        match self {
            TaskStatus::Created => TaskStatus::Created,
            TaskStatus::Running => TaskStatus::Restart,
            TaskStatus::Restart => TaskStatus::Restart,
            TaskStatus::Done => TaskStatus::Created,
            TaskStatus::Failed => TaskStatus::Created,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct UnknownTaskStatus(pub String);

impl std::str::FromStr for TaskStatus {
    type Err = UnknownTaskStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(TaskStatus::Created),
            "running" => Ok(TaskStatus::Running),
            "restart" => Ok(TaskStatus::Restart),
            "done" => Ok(TaskStatus::Done),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(UnknownTaskStatus(other.to_string())),
        }
    }
}

// ── Options ──────────────────────────────────────────────────────────

/// Options controlling how a claimed task runs.
///
/// Stored as canonical JSON and part of the identity key, so two publishes
/// with different options are distinct tasks. Defaults are applied at
/// publish time, which makes an omitted bag and an explicitly-default bag
/// coalesce into the same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskOptions {
    /// Also (re)generate products derived from this task's output.
    pub derive_products: bool,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            derive_products: true,
        }
    }
}

// ── Descriptor and row ───────────────────────────────────────────────

/// A fully-specified submission for [`crate::TaskQueue::publish`].
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub task_type: TaskType,
    pub site_id: SiteId,
    pub product_id: ProductId,
    pub measurement_date: MeasurementDate,
    /// Present for instrument-sourced products.
    pub instrument_id: Option<InstrumentId>,
    /// Present for model-sourced products.
    pub model_id: Option<ModelId>,
    /// `None` means [`TaskOptions::default`].
    pub options: Option<TaskOptions>,
    /// 0 = highest urgency, 100 = lowest.
    pub priority: i64,
    /// Earliest time the task may be claimed. `None` means now.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Set by bulk submission tools to allow cancelling the batch as a unit.
    pub batch_id: Option<BatchId>,
}

/// A persisted task row.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub task_type: TaskType,
    pub site_id: SiteId,
    pub product_id: ProductId,
    pub measurement_date: MeasurementDate,
    pub instrument_id: Option<InstrumentId>,
    pub model_id: Option<ModelId>,
    pub options: TaskOptions,
    pub status: TaskStatus,
    pub priority: i64,
    pub scheduled_at: DateTime<Utc>,
    /// Set iff `status` is `done`; cleared whenever the task is revived.
    pub done_at: Option<DateTime<Utc>>,
    pub batch_id: Option<BatchId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn bad_column(
    column: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

/// Timestamps are stored as unix seconds (see the schema in `queue.rs`).
fn unix_column(column: &str, secs: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("timestamp out of range: {secs}").into(),
    })
}

impl FromRow<'_, SqliteRow> for Task {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let task_type: String = row.try_get("task_type")?;
        let measurement_date: String = row.try_get("measurement_date")?;
        let options: String = row.try_get("options")?;
        let status: String = row.try_get("status")?;
        let batch_id: Option<String> = row.try_get("batch_id")?;
        let done_at: Option<i64> = row.try_get("done_at")?;

        Ok(Self {
            id: id.parse().map_err(|e| bad_column("id", e))?,
            task_type: task_type.parse().map_err(|e| bad_column("task_type", e))?,
            site_id: row.try_get("site_id")?,
            product_id: row.try_get("product_id")?,
            measurement_date: measurement_date
                .parse()
                .map_err(|e| bad_column("measurement_date", e))?,
            instrument_id: row.try_get("instrument_id")?,
            model_id: row.try_get("model_id")?,
            options: serde_json::from_str(&options).map_err(|e| bad_column("options", e))?,
            status: status.parse().map_err(|e| bad_column("status", e))?,
            priority: row.try_get("priority")?,
            scheduled_at: unix_column("scheduled_at", row.try_get("scheduled_at")?)?,
            done_at: done_at.map(|s| unix_column("done_at", s)).transpose()?,
            batch_id: batch_id
                .map(|s| s.parse().map_err(|e| bad_column("batch_id", e)))
                .transpose()?,
            created_at: unix_column("created_at", row.try_get("created_at")?)?,
            updated_at: unix_column("updated_at", row.try_get("updated_at")?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn republish_transition_table() {
        assert_eq!(TaskStatus::Created.on_republish(), TaskStatus::Created);
        assert_eq!(TaskStatus::Running.on_republish(), TaskStatus::Restart);
        assert_eq!(TaskStatus::Restart.on_republish(), TaskStatus::Restart);
        assert_eq!(TaskStatus::Done.on_republish(), TaskStatus::Created);
        assert_eq!(TaskStatus::Failed.on_republish(), TaskStatus::Created);
    }

    #[test]
    fn status_str_roundtrip() {
        for s in [
            TaskStatus::Created,
            TaskStatus::Running,
            TaskStatus::Restart,
            TaskStatus::Done,
            TaskStatus::Failed,
        ] {
            assert_eq!(s.as_str().parse::<TaskStatus>().unwrap(), s);
        }
        assert!("paused".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn options_default_from_empty_bag() {
        let opts: TaskOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, TaskOptions::default());
        assert!(opts.derive_products);
    }

    #[test]
    fn options_canonical_json_is_stable() {
        let a = serde_json::to_string(&TaskOptions::default()).unwrap();
        let b = serde_json::to_string(&TaskOptions {
            derive_products: true,
        })
        .unwrap();
        assert_eq!(a, b);
    }
}
