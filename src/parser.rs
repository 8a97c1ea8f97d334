//! Sale announcement parser.
//!
//! Reps post free text like `🛜 +1 Jane Doe 11/25 Kinetic 1G`: their running
//! count for today, the customer, the install date, the provider and the
//! speed. Parsing is best-effort. Anything that doesn't have a count followed
//! later by a month/day token is "not a sale" and yields `None`.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{SaleEvent, Timestamp};

/// Fewer tokens than this can't hold a count, a date and anything else.
const MIN_TOKENS: usize = 3;

// Compile-once regex patterns via OnceLock.

/// Optional sign and digits, tolerating emoji or punctuation glued in front (`📶+2`).
fn re_count() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\w+\-]*([+-]?[0-9]+)$").unwrap())
}

fn re_install_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+/[0-9]+$").unwrap())
}

fn re_speed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+(?:G|M|g|m|Mbps|mbps)?$").unwrap())
}

/// Parse a chat message into a sale, stamped with `now`.
///
/// `sale_date` is the calendar date of `now` in its own offset, so callers
/// pass `now` already converted to the leaderboard's timezone.
pub fn parse_sale_at(text: &str, sender_name: &str, now: Timestamp) -> Option<SaleEvent> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return None;
    }

    let (count_index, count_token) = tokens.iter().copied().enumerate().find_map(|(i, t)| {
        re_count()
            .captures(t)
            .and_then(|caps| caps.get(1))
            .map(|m| (i, m.as_str()))
    })?;
    // An overflowing count is a malformed message, not a reason to keep looking.
    let today_reported: i64 = count_token.parse().ok()?;

    let date_index = tokens
        .iter()
        .enumerate()
        .skip(count_index + 1)
        .find(|(_, t)| re_install_date().is_match(t))
        .map(|(i, _)| i)?;

    let speed_index = find_speed_index(&tokens, date_index);

    let provider = if speed_index > date_index + 1 {
        tokens[date_index + 1..speed_index].join(" ")
    } else {
        String::new()
    };

    Some(SaleEvent {
        rep_name: sender_name.to_string(),
        today_reported,
        customer_name: tokens[count_index + 1..date_index].join(" "),
        install_date: tokens[date_index].to_string(),
        provider,
        speed: tokens[speed_index].to_string(),
        sale_date: now.date_naive(),
        timestamp: now,
    })
}

/// Pick the speed token.
///
/// The last token wins if it looks like a speed. Otherwise the nearest
/// speed-looking token before it (but after the date) is used, which skips
/// trailing chatter like `max 1-3`. When nothing looks like a speed the last
/// token is kept as-is.
fn find_speed_index(tokens: &[&str], date_index: usize) -> usize {
    let last = tokens.len() - 1;
    (date_index + 1..=last)
        .rev()
        .find(|&i| re_speed().is_match(tokens[i]))
        .unwrap_or(last)
}
