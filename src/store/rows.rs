//! Text <-> typed conversion at the store boundary.
//!
//! Numeric cells are lenient: surrounding whitespace is ignored, a leading
//! base-10 integer is taken from the cell, and anything else reads as 0.

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};

use crate::types::{LeaderboardEntry, Row, SaleLogRecord, Timestamp};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a counter cell. Blank or non-numeric cells are 0.
pub fn parse_count(cell: &str) -> i64 {
    let cell = cell.trim();
    let digits_end = cell
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '+' || c == '-'))))
        .map(|(i, _)| i)
        .unwrap_or(cell.len());
    cell[..digits_end].parse().unwrap_or(0)
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, false)
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Calendar date of a stored `LastUpdate` cell, seen from `offset`.
///
/// Full RFC 3339 instants are shifted into `offset` first. Otherwise a
/// leading `YYYY-MM-DD` is taken as-is. Returns `None` when neither applies.
pub fn stored_date(raw: &str, offset: &FixedOffset) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(offset).date_naive());
    }
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Counters never go below zero, even when a cell was edited by hand.
fn counter(cell: &str) -> i64 {
    parse_count(cell).max(0)
}

/// Read one leaderboard row. Rows without a rep name are skipped.
pub fn entry_from_row(row: &[String]) -> Option<LeaderboardEntry> {
    let rep_name = cell(row, 0).trim();
    if rep_name.is_empty() {
        return None;
    }
    Some(LeaderboardEntry {
        rep_name: rep_name.to_string(),
        today: counter(cell(row, 1)),
        week: counter(cell(row, 2)),
        month: counter(cell(row, 3)),
        lifetime: counter(cell(row, 4)),
        last_update: cell(row, 5).to_string(),
    })
}

pub fn entry_to_row(entry: &LeaderboardEntry) -> Row {
    vec![
        entry.rep_name.clone(),
        entry.today.to_string(),
        entry.week.to_string(),
        entry.month.to_string(),
        entry.lifetime.to_string(),
        entry.last_update.clone(),
    ]
}

pub fn entries_from_rows(rows: &[Row]) -> Vec<LeaderboardEntry> {
    rows.iter().filter_map(|row| entry_from_row(row)).collect()
}

pub fn entries_to_rows(entries: &[LeaderboardEntry]) -> Vec<Row> {
    entries.iter().map(entry_to_row).collect()
}

pub fn record_to_row(record: &SaleLogRecord) -> Row {
    vec![
        format_timestamp(&record.timestamp),
        record.rep_name.clone(),
        record.customer_name.clone(),
        format_date(&record.sale_date),
        record.install_date.clone(),
        record.provider.clone(),
        record.speed.clone(),
        record.today_reported_at_time_of_sale.to_string(),
    ]
}

/// Rep and sale date of a log row, or `None` if either is missing or malformed.
pub fn logged_sale(row: &[String]) -> Option<(&str, NaiveDate)> {
    let rep_name = cell(row, 1).trim();
    if rep_name.is_empty() {
        return None;
    }
    let sale_date = NaiveDate::parse_from_str(cell(row, 3).trim(), DATE_FORMAT).ok()?;
    Some((rep_name, sale_date))
}
