//! Standings text for chat.
//!
//! Input is already sorted by the reconciler; rank is position in that
//! order, so tied reps get consecutive ranks.

use crate::types::{SaleLogRecord, Standing};

/// A rank paired with its standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedStanding<'a> {
    pub rank: usize,
    pub standing: &'a Standing,
}

/// Number the standings from 1.
pub fn rank(standings: &[Standing]) -> Vec<RankedStanding<'_>> {
    standings
        .iter()
        .enumerate()
        .map(|(i, standing)| RankedStanding { rank: i + 1, standing })
        .collect()
}

fn medal(rank: usize) -> &'static str {
    match rank {
        1 => "🥇",
        2 => "🥈",
        3 => "🥉",
        _ => "  ",
    }
}

/// Ranked list, one rep per line: `🥇 1. Alice: 3`.
pub fn format_standings(standings: &[Standing]) -> String {
    if standings.is_empty() {
        return "No sales on the board yet.".to_string();
    }
    rank(standings)
        .iter()
        .map(|r| {
            format!(
                "{} {}. {}: {}",
                medal(r.rank),
                r.rank,
                r.standing.rep_name,
                r.standing.today
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Message posted after a sale is recorded.
pub fn format_sale_notification(record: &SaleLogRecord, standings: &[Standing]) -> String {
    let mut details = Vec::new();
    if !record.provider.is_empty() {
        details.push(record.provider.clone());
    }
    if !record.speed.is_empty() {
        details.push(record.speed.clone());
    }

    let mut headline = format!("🎉 {} closed a sale", record.rep_name);
    if !record.customer_name.is_empty() {
        headline.push_str(&format!(" for {}", record.customer_name));
    }
    if !details.is_empty() {
        headline.push_str(&format!(" ({})", details.join(" ")));
    }
    headline.push_str(&format!(", install {}", record.install_date));

    format!(
        "{}\n\n🏆 Today's standings\n{}",
        headline,
        format_standings(standings)
    )
}
