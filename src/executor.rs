//! Rollup execution
//!
//! The rollup runs once per local day, normally just after midnight:
//! - Summarize the previous day from the sales log and post the recap
//! - Reset daily counters (and weekly ones on the week-start day)
//! - Reset monthly counters on the 1st, when enabled

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc;

use crate::error::ExecutionError;
use crate::leaderboard::rollup::{
    format_recap, reset_counters, summarize, DailySummary, ResetResult,
};
use crate::notification::send_or_log;
use crate::scheduler::SchedulerMessage;
use crate::state::AppState;
use crate::types::ExecutionTrigger;

/// Result of one rollup run.
#[derive(Debug, Clone)]
pub struct RollupReport {
    pub summary: DailySummary,
    pub recap_sent: bool,
    pub reset: ResetResult,
}

/// Executor runs rollups requested by the scheduler
pub struct Executor {
    state: Arc<AppState>,
}

impl Executor {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Start the executor loop
    ///
    /// Listens for rollup requests until the scheduler drops its sender.
    pub async fn run(&self, mut receiver: mpsc::Receiver<SchedulerMessage>) {
        while let Some(msg) = receiver.recv().await {
            log::info!("Running rollup for {} (trigger: {:?})", msg.date, msg.trigger);

            if let Err(e) = self.execute(msg.date, msg.trigger).await {
                log::error!(
                    "Rollup for {} failed (retryable: {}): {}",
                    msg.date,
                    e.is_retryable(),
                    e
                );
            }
        }
    }

    pub async fn execute(
        &self,
        current_date: NaiveDate,
        trigger: ExecutionTrigger,
    ) -> Result<RollupReport, ExecutionError> {
        let report = run_rollup(&self.state, current_date).await?;
        log::info!(
            "Rollup for {} done ({:?}): {} sales recapped, {} reps reset",
            current_date,
            trigger,
            report.summary.total,
            report.reset.entries
        );
        Ok(report)
    }
}

/// Recap the day before `current_date`, then reset counters for `current_date`.
///
/// The recap goes out before the reset so a failed reset still leaves the
/// team with yesterday's numbers. Recap delivery failures are swallowed.
/// Daily, weekly and monthly counters are cleared in one table write.
pub async fn run_rollup(
    state: &AppState,
    current_date: NaiveDate,
) -> Result<RollupReport, ExecutionError> {
    let previous = current_date.pred_opt().ok_or_else(|| {
        ExecutionError::ConfigurationError(format!("No day before {}", current_date))
    })?;

    let summary = summarize(state.sales_log.as_ref(), previous).await?;
    let recap_sent = send_or_log(state.notifier.as_ref(), &format_recap(&summary)).await;

    let _guard = state.write_lock.lock().await;
    let reset = reset_counters(
        state.leaderboard.as_ref(),
        current_date,
        state.config.week_start,
        state.config.reset_month_on_first,
        state.now(),
    )
    .await?;

    Ok(RollupReport {
        summary,
        recap_sent,
        reset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::notification::RecordingNotifier;
    use crate::store::rows::entries_from_rows;
    use crate::store::MemoryStore;
    use crate::types::{Config, Row};

    fn board_row(rep: &str, today: i64, week: i64, month: i64, lifetime: i64) -> Row {
        vec![
            rep.to_string(),
            today.to_string(),
            week.to_string(),
            month.to_string(),
            lifetime.to_string(),
            "2025-11-19T17:00:00.000-05:00".to_string(),
        ]
    }

    fn log_row(rep: &str, sale_date: &str) -> Row {
        vec![
            format!("{}T10:00:00.000-05:00", sale_date),
            rep.to_string(),
            "Customer".to_string(),
            sale_date.to_string(),
            "11/25".to_string(),
            "Kinetic".to_string(),
            "1G".to_string(),
            "1".to_string(),
        ]
    }

    fn seeded_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_tables(
            vec![
                board_row("Alice", 2, 5, 9, 40),
                board_row("Bob", 1, 1, 3, 12),
            ],
            vec![
                log_row("Alice", "2025-11-19"),
                log_row("Bob", "2025-11-19"),
                log_row("alice", "2025-11-19"),
                log_row("Bob", "2025-11-18"),
            ],
        ))
    }

    fn state(store: Arc<MemoryStore>, notifier: Arc<RecordingNotifier>, config: Config) -> AppState {
        AppState::new(config, store.clone(), store, notifier).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_rollup_recaps_previous_day_and_resets_today() {
        let store = seeded_store();
        let notifier = Arc::new(RecordingNotifier::new());
        let state = state(store.clone(), notifier.clone(), Config::default());

        // Thursday, not a week start and not the 1st.
        let report = run_rollup(&state, date(2025, 11, 20)).await.unwrap();

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.per_rep[0].rep_name, "Alice");
        assert_eq!(report.summary.per_rep[0].count, 2);
        assert!(report.recap_sent);
        assert!(!report.reset.week_reset);
        assert!(!report.reset.month_reset);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Wednesday, Nov 19"));
        assert!(sent[0].contains("Total: 3 sales"));

        let entries = entries_from_rows(&store.leaderboard_rows());
        assert_eq!(
            (entries[0].today, entries[0].week, entries[0].month, entries[0].lifetime),
            (0, 5, 9, 40)
        );
    }

    #[tokio::test]
    async fn test_rollup_on_week_start_and_first_of_month() {
        let store = seeded_store();
        let notifier = Arc::new(RecordingNotifier::new());
        let state = state(store.clone(), notifier, Config::default());

        // 2025-12-01 is a Monday.
        let report = run_rollup(&state, date(2025, 12, 1)).await.unwrap();
        assert!(report.reset.week_reset);
        assert!(report.reset.month_reset);

        let entries = entries_from_rows(&store.leaderboard_rows());
        assert_eq!(
            (entries[1].today, entries[1].week, entries[1].month, entries[1].lifetime),
            (0, 0, 0, 12)
        );
    }

    #[tokio::test]
    async fn test_monthly_reset_can_be_disabled() {
        let store = seeded_store();
        let notifier = Arc::new(RecordingNotifier::new());
        let config = Config {
            reset_month_on_first: false,
            ..Config::default()
        };
        let state = state(store.clone(), notifier, config);

        let report = run_rollup(&state, date(2025, 12, 1)).await.unwrap();
        assert!(!report.reset.month_reset);
        assert_eq!(entries_from_rows(&store.leaderboard_rows())[0].month, 9);
    }

    #[tokio::test]
    async fn test_failed_recap_still_resets() {
        let store = seeded_store();
        let state = state(
            store.clone(),
            Arc::new(RecordingNotifier::failing()),
            Config::default(),
        );

        let report = run_rollup(&state, date(2025, 11, 20)).await.unwrap();
        assert!(!report.recap_sent);
        assert_eq!(entries_from_rows(&store.leaderboard_rows())[0].today, 0);
    }

    #[tokio::test]
    async fn test_executor_drains_channel() {
        let store = seeded_store();
        let notifier = Arc::new(RecordingNotifier::new());
        let state = Arc::new(state(store, notifier.clone(), Config::default()));

        let (tx, rx) = mpsc::channel(4);
        tx.send(SchedulerMessage {
            date: date(2025, 11, 20),
            trigger: ExecutionTrigger::Manual,
        })
        .await
        .unwrap();
        drop(tx);

        Executor::new(state).run(rx).await;
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_execute_for_explicit_date() {
        let store = seeded_store();
        let notifier = Arc::new(RecordingNotifier::new());
        let state = Arc::new(state(store.clone(), notifier.clone(), Config::default()));

        let report = Executor::new(state)
            .execute(date(2025, 11, 20), ExecutionTrigger::Manual)
            .await
            .unwrap();
        assert_eq!(report.reset.entries, 2);
        assert!(notifier.sent()[0].contains("Wednesday, Nov 19"));
    }
}
