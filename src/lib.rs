//! Salesboard: tracks sales announced in a team chat space.
//!
//! Reads chat message events, turns "+N Customer MM/DD Provider Speed"
//! announcements into leaderboard updates, posts standings back, and rolls
//! the counters over once per day.

pub mod error;
pub mod executor;
pub mod leaderboard;
mod migrations;
pub mod notification;
pub mod parser;
pub mod processor;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod types;

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use executor::Executor;
use scheduler::Scheduler;
use state::{load_config, AppState};
use types::ExecutionTrigger;

/// Channel buffer size for scheduler messages
const SCHEDULER_CHANNEL_SIZE: usize = 32;

/// Entry point shared by the binary.
///
/// With `rollup [YYYY-MM-DD]` runs one rollup and exits. Otherwise starts
/// the scheduler and executor, then handles message events from stdin
/// until it closes.
pub async fn run(args: Vec<String>) -> Result<(), String> {
    let config = load_config()?;
    let state = Arc::new(AppState::from_config(config)?);

    match args.first().map(String::as_str) {
        Some("rollup") => {
            let date = match args.get(1) {
                Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|e| format!("Invalid rollup date '{}': {}", raw, e))?,
                None => state.now().date_naive(),
            };
            Executor::new(state)
                .execute(date, ExecutionTrigger::Manual)
                .await
                .map_err(|e| format!("Rollup for {} failed: {}", date, e))?;
            Ok(())
        }
        Some(other) => Err(format!(
            "Unknown command '{}'. Usage: salesboard [rollup [YYYY-MM-DD]]",
            other
        )),
        None => serve(state).await,
    }
}

async fn serve(state: Arc<AppState>) -> Result<(), String> {
    // Create channel for scheduler -> executor communication
    let (scheduler_tx, scheduler_rx) = mpsc::channel(SCHEDULER_CHANNEL_SIZE);

    let scheduler_state = state.clone();
    tokio::spawn(async move {
        let scheduler = Scheduler::new(scheduler_state, scheduler_tx);
        scheduler.run().await;
    });

    let executor_state = state.clone();
    tokio::spawn(async move {
        let executor = Executor::new(executor_state);
        executor.run(scheduler_rx).await;
    });

    log::info!("Salesboard listening for message events on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("Failed to read stdin: {}", e))?
    {
        processor::handle_line(&state, &line).await;
    }

    log::info!("Input closed, shutting down");
    Ok(())
}
