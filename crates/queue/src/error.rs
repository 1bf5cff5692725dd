//! Queue error types.

use thiserror::Error;

use crate::task::UnknownTaskStatus;

/// Infrastructure-level failures of queue operations.
///
/// Races the queue is designed around — republish during a run, settling a
/// cancelled task, two schedulers claiming at once — are not errors and
/// never surface here; they resolve to no-ops or `None` results.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("task options encoding error: {0}")]
    Options(#[from] serde_json::Error),

    #[error("corrupt task row: {0}")]
    CorruptStatus(#[from] UnknownTaskStatus),
}
