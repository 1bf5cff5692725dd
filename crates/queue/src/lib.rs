//! Processing task queue for the Cumulus measurement portal.
//!
//! A persistent, prioritized work queue that sequences asynchronous
//! data-processing jobs (reprocessing, freezing, plotting, QC, export)
//! across sites, instruments, models and calendar dates. The queue only
//! decides which job a worker may claim next and tracks its lifecycle —
//! the actual processing happens in whoever calls [`TaskQueue::receive`].
//!
//! All coordination goes through a single SQLite `tasks` table; there is
//! no in-memory queue, so claims survive process restarts and multiple
//! scheduler instances can poll the same database.

pub mod error;
pub mod queue;
pub mod task;

mod lifecycle;
mod maintenance;
mod publisher;
mod scheduler;


pub use error::QueueError;
pub use queue::{QueuePolicy, TaskQueue};
pub use task::{Task, TaskDescriptor, TaskOptions, TaskStatus, UnknownTaskStatus};
