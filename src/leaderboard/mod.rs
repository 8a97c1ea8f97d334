//! Leaderboard bookkeeping
//!
//! - `reconcile`: apply one sale to the counters and append it to the log
//! - `standings`: rank reps by today's count for display
//! - `rollup`: day-end summary and the daily/weekly/monthly resets

pub mod reconcile;
pub mod rollup;
pub mod standings;

use crate::types::{LeaderboardEntry, Standing};

/// Sort descending by `today`. Stable, so ties keep their table order.
pub(crate) fn sort_by_today(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| b.today.cmp(&a.today));
}

pub(crate) fn standings_of(entries: &[LeaderboardEntry]) -> Vec<Standing> {
    entries
        .iter()
        .map(|e| Standing {
            rep_name: e.rep_name.clone(),
            today: e.today,
        })
        .collect()
}
