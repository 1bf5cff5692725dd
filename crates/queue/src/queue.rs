//! The task queue handle and its backing `tasks` table.
//!
//! The table is the only shared mutable state: publish is an upsert
//! transaction, claiming is a single `UPDATE … WHERE id = (SELECT …)`
//! statement, and settling is a pair of conditional updates. SQLite's
//! single-writer model makes each of those atomic against concurrent
//! publishers and schedulers.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use cumulus_core::config::{DatabaseConfig, QueueConfig};

use crate::error::QueueError;
use crate::task::Task;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS tasks (
        id               TEXT PRIMARY KEY,
        task_type        TEXT NOT NULL,
        site_id          TEXT NOT NULL,
        product_id       TEXT NOT NULL,
        measurement_date TEXT NOT NULL,
        instrument_id    TEXT,
        model_id         TEXT,
        options          TEXT NOT NULL,
        status           TEXT NOT NULL,
        priority         INTEGER NOT NULL,
        scheduled_at     INTEGER NOT NULL,
        done_at          INTEGER,
        batch_id         TEXT,
        created_at       INTEGER NOT NULL,
        updated_at       INTEGER NOT NULL
    )",
    // Identity key. NULL instrument/model ids are coalesced to '' so that
    // repeated publishes without them still hit the same index entry.
    "CREATE UNIQUE INDEX IF NOT EXISTS tasks_identity
     ON tasks (task_type, site_id, measurement_date, product_id,
               COALESCE(instrument_id, ''), COALESCE(model_id, ''), options)",
    "CREATE INDEX IF NOT EXISTS tasks_claimable ON tasks (status, scheduled_at)",
    // Conflict resource key, consulted for every claim.
    "CREATE INDEX IF NOT EXISTS tasks_resource
     ON tasks (site_id, measurement_date, product_id) WHERE status = 'running'",
    "CREATE INDEX IF NOT EXISTS tasks_batch ON tasks (batch_id) WHERE batch_id IS NOT NULL",
];

/// Aging and retention policy, typically built from [`QueueConfig`].
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    /// Maximum priority boost a waiting task can accumulate.
    pub aging_max_boost: f64,
    /// Minutes of waiting over which the full boost accrues.
    pub aging_window_minutes: u32,
    /// Terminal rows older than this many days are garbage collected.
    pub retention_days: u32,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

impl From<&QueueConfig> for QueuePolicy {
    fn from(config: &QueueConfig) -> Self {
        Self {
            aging_max_boost: config.aging_max_boost,
            aging_window_minutes: config.aging_window_minutes,
            retention_days: config.retention_days,
        }
    }
}

impl QueuePolicy {
    pub(crate) fn aging_window_seconds(&self) -> f64 {
        f64::from(self.aging_window_minutes) * 60.0
    }
}

/// Handle to the processing task queue.
///
/// Cheap to clone; all state lives in the database.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    pool: SqlitePool,
    policy: QueuePolicy,
}

impl TaskQueue {
    /// Wrap an existing pool and ensure the schema exists.
    pub async fn new(pool: SqlitePool, policy: QueuePolicy) -> Result<Self, QueueError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool, policy })
    }

    /// Open (creating if missing) the configured database and ensure the
    /// schema exists. WAL keeps schedulers reading while a publish commits.
    pub async fn connect(
        database: &DatabaseConfig,
        policy: QueuePolicy,
    ) -> Result<Self, QueueError> {
        let options = SqliteConnectOptions::from_str(&database.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(database.max_connections)
            .connect_with(options)
            .await?;
        Self::new(pool, policy).await
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) fn policy(&self) -> &QueuePolicy {
        &self.policy
    }

    /// Look up a single task by id.
    pub async fn find(&self, id: Uuid) -> Result<Option<Task>, QueueError> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }
}
