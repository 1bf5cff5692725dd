//! queue-admin — operational CLI for the Cumulus processing task queue.
//!
//! # Usage
//!
//! ```bash
//! # Row counts (all rows, or one status)
//! queue-admin count
//! queue-admin count --status running
//!
//! # Garbage-collect terminal rows past the retention window
//! queue-admin clean
//!
//! # Drop every row (requires confirmation)
//! queue-admin clear --yes
//! ```
//!
//! Database location and queue policy come from the environment
//! (`DATABASE_URL`, `QUEUE_*`), optionally via a `.env` file.

use chrono::Utc;
use clap::{Parser, Subcommand};

use cumulus_core::config::{load_dotenv, Config};
use cumulus_queue::{QueuePolicy, TaskQueue, TaskStatus};

/// Operational CLI for the Cumulus processing task queue.
#[derive(Parser, Debug)]
#[command(name = "queue-admin", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count task rows, optionally filtered by status.
    Count {
        /// One of: created, running, restart, done, failed.
        #[arg(long)]
        status: Option<String>,
    },
    /// Delete terminal tasks older than the retention window.
    Clean,
    /// Delete every task row.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let queue = TaskQueue::connect(&config.database, QueuePolicy::from(&config.queue)).await?;

    match cli.command {
        Command::Count { status } => {
            let status = status.map(|s| s.parse::<TaskStatus>()).transpose()?;
            println!("{}", queue.count(status).await?);
        }
        Command::Clean => {
            let removed = queue.clean_old_tasks(Utc::now()).await?;
            println!("removed {removed} old tasks");
        }
        Command::Clear { yes } => {
            if !yes {
                anyhow::bail!("refusing to clear the queue without --yes");
            }
            queue.clear().await?;
            println!("queue cleared");
        }
    }
    Ok(())
}
