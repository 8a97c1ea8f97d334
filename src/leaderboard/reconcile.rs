//! Apply a sale to the leaderboard.
//!
//! Reps only ever announce their cumulative count for today, never an
//! increment. Weekly, monthly and lifetime totals are therefore grown by the
//! difference between successive "today" reports:
//! - a report on a new local day starts from a baseline of 0
//! - a report lower than the baseline (a correction or a typo) counts in full
//! - totals never go down
//!
//! The whole table is read, patched in memory and written back. There is no
//! row locking, so two processes reconciling at once can lose an update.

use crate::error::StoreError;
use crate::store::rows::{self, entries_from_rows, entries_to_rows};
use crate::store::{LeaderboardStore, SalesLogStore};
use crate::types::{LeaderboardEntry, SaleEvent, SaleLogRecord, Standing, Timestamp};

use super::{sort_by_today, standings_of};

/// Result of reconciling one sale.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Every rep, highest `today` first.
    pub standings: Vec<Standing>,
    /// The row appended to the sales log.
    pub record: SaleLogRecord,
    /// Amount added to week/month/lifetime for the reporting rep.
    pub delta: i64,
}

/// Record `event` against the leaderboard and the sales log.
///
/// Store failures abort before anything is appended to the log. A failure
/// on append happens after the leaderboard was written; nothing is rolled
/// back.
pub async fn reconcile(
    leaderboard: &dyn LeaderboardStore,
    sales_log: &dyn SalesLogStore,
    event: &SaleEvent,
    now: Timestamp,
) -> Result<ReconcileOutcome, StoreError> {
    let mut entries = entries_from_rows(&leaderboard.read_all().await?);

    let delta = apply_sale(&mut entries, event, now);

    sort_by_today(&mut entries);
    leaderboard.write_all(entries_to_rows(&entries)).await?;

    let record = SaleLogRecord::from(event);
    sales_log.append(rows::record_to_row(&record)).await?;

    log::info!(
        "Recorded sale for {} (reported {}, +{} to totals)",
        event.rep_name,
        event.today_reported,
        delta
    );

    Ok(ReconcileOutcome {
        standings: standings_of(&entries),
        record,
        delta,
    })
}

/// Update (or create) the rep's entry in place. Returns the delta applied.
pub fn apply_sale(entries: &mut Vec<LeaderboardEntry>, event: &SaleEvent, now: Timestamp) -> i64 {
    // Counters are non-negative; a negative report counts as zero.
    let reported = event.today_reported.max(0);
    let stamp = rows::format_timestamp(&now);

    let Some(index) = entries.iter().position(|e| e.matches(&event.rep_name)) else {
        entries.push(LeaderboardEntry {
            rep_name: event.rep_name.clone(),
            today: reported,
            week: reported,
            month: reported,
            lifetime: reported,
            last_update: stamp,
        });
        return reported;
    };
    let entry = &mut entries[index];

    let prev_date = rows::stored_date(&entry.last_update, event.timestamp.offset());
    let baseline = match prev_date {
        Some(date) if date != event.sale_date => 0,
        _ => entry.today,
    };

    let mut delta = reported.saturating_sub(baseline);
    if delta < 0 {
        delta = reported;
    }

    // Totals saturate rather than wrap on absurd reports.
    entry.today = reported;
    entry.week = entry.week.saturating_add(delta);
    entry.month = entry.month.saturating_add(delta);
    entry.lifetime = entry.lifetime.saturating_add(delta);
    entry.last_update = stamp;

    delta
}
