//! Day-end rollup: the daily recap and the counter resets.
//!
//! `summarize` only reads the sales log. The resets rewrite the whole
//! leaderboard and must not overlap a reconciliation.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::StoreError;
use crate::store::rows::{self, entries_from_rows, entries_to_rows};
use crate::store::{LeaderboardStore, SalesLogStore};
use crate::types::Timestamp;

/// Sales per rep logged on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Highest count first; ties keep the order reps first appear in the log.
    pub per_rep: Vec<RepCount>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepCount {
    pub rep_name: String,
    pub count: usize,
}

/// What a reset changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetResult {
    pub entries: usize,
    pub week_reset: bool,
    pub month_reset: bool,
}

/// Count log records whose sale date is `date`, per rep.
///
/// Reps are grouped case-insensitively under the first spelling seen.
/// Rows with a missing rep or an unreadable sale date are skipped.
pub async fn summarize(
    sales_log: &dyn SalesLogStore,
    date: NaiveDate,
) -> Result<DailySummary, StoreError> {
    let log_rows = sales_log.scan().await?;

    let mut per_rep: Vec<RepCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for row in &log_rows {
        let Some((rep_name, sale_date)) = rows::logged_sale(row) else {
            skipped += 1;
            continue;
        };
        if sale_date != date {
            continue;
        }
        let slot = *index.entry(rep_name.to_lowercase()).or_insert_with(|| {
            per_rep.push(RepCount {
                rep_name: rep_name.to_string(),
                count: 0,
            });
            per_rep.len() - 1
        });
        per_rep[slot].count += 1;
    }

    if skipped > 0 {
        log::warn!("Skipped {} unreadable sales log rows while summarizing {}", skipped, date);
    }

    per_rep.sort_by(|a, b| b.count.cmp(&a.count));
    let total = per_rep.iter().map(|r| r.count).sum();

    Ok(DailySummary {
        date,
        per_rep,
        total,
    })
}

/// Zero `today` for every rep, and `week` too when `current_date` starts a week.
///
/// Month and lifetime are left alone. Running it twice on the same
/// non-week-start date leaves the counters as the first run did.
pub async fn reset_daily(
    leaderboard: &dyn LeaderboardStore,
    current_date: NaiveDate,
    week_start: Weekday,
    now: Timestamp,
) -> Result<ResetResult, StoreError> {
    reset_counters(leaderboard, current_date, week_start, false, now).await
}

/// The daily reset plus, when `monthly` is set and `current_date` is the
/// 1st, the monthly one. Everything lands in a single table write, so a
/// failure leaves the board exactly as it was.
pub async fn reset_counters(
    leaderboard: &dyn LeaderboardStore,
    current_date: NaiveDate,
    week_start: Weekday,
    monthly: bool,
    now: Timestamp,
) -> Result<ResetResult, StoreError> {
    let week_reset = current_date.weekday() == week_start;
    let month_reset = monthly && current_date.day() == 1;

    let mut entries = entries_from_rows(&leaderboard.read_all().await?);
    let stamp = rows::format_timestamp(&now);

    for entry in entries.iter_mut() {
        entry.today = 0;
        if week_reset {
            entry.week = 0;
        }
        if month_reset {
            entry.month = 0;
        }
        entry.last_update = stamp.clone();
    }

    leaderboard.write_all(entries_to_rows(&entries)).await?;

    log::info!(
        "Reset for {}: {} reps{}{}",
        current_date,
        entries.len(),
        if week_reset { ", weekly counters cleared" } else { "" },
        if month_reset { ", monthly counters cleared" } else { "" }
    );

    Ok(ResetResult {
        entries: entries.len(),
        week_reset,
        month_reset,
    })
}

/// Recap message for the chat space.
pub fn format_recap(summary: &DailySummary) -> String {
    let date = summary.date.format("%A, %b %-d");

    if summary.per_rep.is_empty() {
        return format!("📊 Daily recap for {}: no sales logged.", date);
    }

    let lines: Vec<String> = summary
        .per_rep
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}: {}", i + 1, r.rep_name, r.count))
        .collect();

    format!(
        "📊 Daily recap for {}\n{}\nTotal: {} sale{}",
        date,
        lines.join("\n"),
        summary.total,
        if summary.total == 1 { "" } else { "s" }
    )
}
