//! Scheduler for the cron-based rollup
//!
//! Manages the rollup job with support for:
//! - Cron expression parsing
//! - Timezone-aware scheduling
//! - Sleep/wake detection via time-jump polling
//! - Missed job handling (runs if within grace period)

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::mpsc;

use crate::error::ExecutionError;
use crate::state::AppState;
use crate::types::{ExecutionTrigger, ScheduleEntry};

/// Grace period for missed jobs (2 hours)
const MISSED_JOB_GRACE_PERIOD_SECS: i64 = 7200;

/// Time jump threshold to detect sleep/wake (5 minutes)
const TIME_JUMP_THRESHOLD_SECS: i64 = 300;

/// Poll interval for scheduler loop (1 minute)
const POLL_INTERVAL_SECS: u64 = 60;

/// Window around a scheduled time in which the job still fires (2 minutes)
const FIRE_WINDOW_SECS: i64 = 120;

/// Message sent to trigger a rollup
#[derive(Debug, Clone)]
pub struct SchedulerMessage {
    /// Local date of the scheduled run in the leaderboard's timezone.
    pub date: NaiveDate,
    pub trigger: ExecutionTrigger,
}

/// Scheduler for the rollup job
pub struct Scheduler {
    state: Arc<AppState>,
    sender: mpsc::Sender<SchedulerMessage>,
}

impl Scheduler {
    pub fn new(state: Arc<AppState>, sender: mpsc::Sender<SchedulerMessage>) -> Self {
        Self { state, sender }
    }

    /// Start the scheduler loop
    ///
    /// This runs until the executor hangs up, checking for due jobs every minute.
    /// It also handles sleep/wake detection.
    pub async fn run(&self) {
        let entry = self.state.config.schedules.rollup.clone();
        if !entry.enabled {
            log::info!("Rollup schedule disabled");
            return;
        }

        match get_next_run_time(&entry) {
            Ok(next) => log::info!("Next rollup scheduled for {}", next),
            Err(e) => {
                log::error!("Rollup schedule unusable, scheduler not started: {}", e);
                return;
            }
        }

        let mut last_check = Utc::now();

        loop {
            tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;

            let now = Utc::now();

            // Detect sleep: time jumped more than 5 minutes
            let time_jump = (now - last_check).num_seconds();
            if time_jump > TIME_JUMP_THRESHOLD_SECS {
                log::info!(
                    "Detected system wake (time jumped {} seconds), checking for missed rollup",
                    time_jump
                );
                match find_missed_job(&entry, self.state.get_last_scheduled_run(), now) {
                    Ok(Some(scheduled)) => {
                        log::info!("Found missed rollup from {}, running now", scheduled);
                        self.state.set_last_scheduled_run(scheduled);
                        if !self.trigger(ExecutionTrigger::Missed, now).await {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => log::warn!("Missed rollup check failed: {}", e),
                }
            }

            match should_run_now(&entry, self.state.get_last_scheduled_run(), now) {
                Ok(Some(scheduled)) => {
                    self.state.set_last_scheduled_run(scheduled);
                    if !self.trigger(ExecutionTrigger::Scheduled, now).await {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("Rollup schedule check failed: {}", e),
            }

            last_check = now;
        }
    }

    /// Send a rollup request. Returns false once the executor is gone.
    async fn trigger(&self, trigger: ExecutionTrigger, now: DateTime<Utc>) -> bool {
        let date = now.with_timezone(&self.state.timezone).date_naive();
        if self
            .sender
            .send(SchedulerMessage { date, trigger })
            .await
            .is_err()
        {
            log::error!("Failed to send rollup message for {}", date);
            return false;
        }
        true
    }
}

fn parse_entry(entry: &ScheduleEntry) -> Result<(Schedule, Tz), ExecutionError> {
    let schedule = parse_cron(&entry.cron)?;
    let tz: Tz = entry.timezone.parse().map_err(|_| {
        ExecutionError::ConfigurationError(format!("Invalid timezone: {}", entry.timezone))
    })?;
    Ok((schedule, tz))
}

/// The scheduled time that `now` falls on, unless it already ran.
pub fn should_run_now(
    entry: &ScheduleEntry,
    last_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ExecutionError> {
    let (schedule, tz) = parse_entry(entry)?;
    let now_local = now.with_timezone(&tz);

    // Find the first scheduled time after (now - 2 minutes)
    let mut scheduled_times =
        schedule.after(&(now_local - chrono::Duration::seconds(FIRE_WINDOW_SECS)));

    if let Some(next_time) = scheduled_times.next() {
        let next_utc = next_time.with_timezone(&Utc);
        let diff = (now - next_utc).num_seconds().abs();

        if diff < FIRE_WINDOW_SECS {
            if let Some(last) = last_run {
                if (last - next_utc).num_seconds().abs() < 60 {
                    return Ok(None); // Already ran
                }
            }
            return Ok(Some(next_utc));
        }
    }

    Ok(None)
}

/// Find a scheduled time within the grace period that hasn't run yet.
pub fn find_missed_job(
    entry: &ScheduleEntry,
    last_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, ExecutionError> {
    let (schedule, tz) = parse_entry(entry)?;

    let now_local = now.with_timezone(&tz);
    let grace_start = now_local - chrono::Duration::seconds(MISSED_JOB_GRACE_PERIOD_SECS);

    for scheduled in schedule.after(&grace_start) {
        let scheduled_utc = scheduled.with_timezone(&Utc);

        // Stop if we've passed now
        if scheduled_utc > now {
            break;
        }

        if let Some(last) = last_run {
            if last >= scheduled_utc {
                continue; // Already ran
            }
        }

        return Ok(Some(scheduled_utc));
    }

    Ok(None)
}

/// Parse a cron expression
pub fn parse_cron(expr: &str) -> Result<Schedule, ExecutionError> {
    // The cron crate expects 6 fields (with seconds), but we use 5-field format
    // Add "0" for seconds at the start
    let full_expr = format!("0 {}", expr);

    full_expr.parse::<Schedule>().map_err(|e| {
        ExecutionError::ConfigurationError(format!("Invalid cron expression '{}': {}", expr, e))
    })
}

/// Get the next scheduled time for a job
pub fn get_next_run_time(entry: &ScheduleEntry) -> Result<DateTime<Utc>, ExecutionError> {
    let (schedule, tz) = parse_entry(entry)?;

    let next = schedule.upcoming(tz).next().ok_or_else(|| {
        ExecutionError::ConfigurationError("No upcoming scheduled time".to_string())
    })?;

    Ok(next.with_timezone(&Utc))
}
