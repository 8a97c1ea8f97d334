//! Shared domain types: leaderboard rows, sale events, log records and config.

use chrono::{DateTime, FixedOffset, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Instant stamped on sales and leaderboard updates, carrying the local offset.
pub type Timestamp = DateTime<FixedOffset>;

/// One row of a tabular store, every cell as text.
pub type Row = Vec<String>;

/// Header of the leaderboard table.
pub const LEADERBOARD_HEADER: [&str; 6] = ["Rep", "Today", "Week", "Month", "Lifetime", "LastUpdate"];

/// Header of the sales log table.
pub const SALES_LOG_HEADER: [&str; 8] = [
    "Timestamp",
    "Rep",
    "Customer",
    "SaleDate",
    "InstallDate",
    "Provider",
    "Speed",
    "TodayReported",
];

/// Running counters for one rep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Display name as first seen. Matching is case-insensitive.
    pub rep_name: String,
    pub today: i64,
    pub week: i64,
    pub month: i64,
    pub lifetime: i64,
    /// Raw stored value; may be blank or unparseable on rows written by hand.
    pub last_update: String,
}

impl LeaderboardEntry {
    /// Lookup key for case-insensitive rep matching.
    pub fn key(&self) -> String {
        self.rep_name.to_lowercase()
    }

    pub fn matches(&self, rep_name: &str) -> bool {
        self.key() == rep_name.to_lowercase()
    }
}

/// A sale extracted from one chat message. Consumed once by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleEvent {
    pub rep_name: String,
    /// The rep's cumulative count for today, as typed. Not an increment.
    pub today_reported: i64,
    pub customer_name: String,
    /// Month/day exactly as typed, e.g. `11/25`.
    pub install_date: String,
    pub provider: String,
    pub speed: String,
    /// Local processing date.
    pub sale_date: NaiveDate,
    pub timestamp: Timestamp,
}

/// Immutable sales log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLogRecord {
    pub timestamp: Timestamp,
    pub rep_name: String,
    pub customer_name: String,
    pub sale_date: NaiveDate,
    pub install_date: String,
    pub provider: String,
    pub speed: String,
    pub today_reported_at_time_of_sale: i64,
}

impl From<&SaleEvent> for SaleLogRecord {
    fn from(event: &SaleEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            rep_name: event.rep_name.clone(),
            customer_name: event.customer_name.clone(),
            sale_date: event.sale_date,
            install_date: event.install_date.clone(),
            provider: event.provider.clone(),
            speed: event.speed.clone(),
            today_reported_at_time_of_sale: event.today_reported,
        }
    }
}

/// A rep's position in the standings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub rep_name: String,
    pub today: i64,
}

/// Who sent an inbound chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    User,
    Bot,
}

/// A chat message as delivered by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    #[serde(default)]
    pub text: String,
    pub sender_display_name: String,
    #[serde(default = "default_sender_kind")]
    pub sender_kind: SenderKind,
}

fn default_sender_kind() -> SenderKind {
    SenderKind::User
}

/// How a rollup run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionTrigger {
    Scheduled,
    Missed,
    Manual,
}

// =============================================================================
// Configuration
// =============================================================================

/// Main configuration, read from `~/.salesboard/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// SQLite file holding the leaderboard and sales log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    /// IANA timezone that defines the local day.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Weekday on which weekly counters reset.
    #[serde(default = "default_week_start")]
    pub week_start: Weekday,
    /// Zero monthly counters when the rollup runs on the 1st.
    #[serde(default = "default_true")]
    pub reset_month_on_first: bool,
    /// Incoming-webhook URL of the chat space. Messages go to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub schedules: Schedules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            timezone: default_timezone(),
            week_start: default_week_start(),
            reset_month_on_first: true,
            webhook_url: None,
            schedules: Schedules::default(),
        }
    }
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_week_start() -> Weekday {
    Weekday::Mon
}

fn default_true() -> bool {
    true
}

/// Schedule configuration for periodic jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedules {
    #[serde(default = "ScheduleEntry::default_rollup")]
    pub rollup: ScheduleEntry,
}

impl Default for Schedules {
    fn default() -> Self {
        Self {
            rollup: ScheduleEntry::default_rollup(),
        }
    }
}

/// A single schedule entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub enabled: bool,
    pub cron: String,
    pub timezone: String,
}

impl ScheduleEntry {
    /// Default schedule for the rollup: midnight daily
    pub fn default_rollup() -> Self {
        Self {
            enabled: true,
            cron: "0 0 * * *".to_string(),
            timezone: default_timezone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.timezone, "America/New_York");
        assert_eq!(config.week_start, Weekday::Mon);
        assert!(config.reset_month_on_first);
        assert!(config.webhook_url.is_none());
        assert_eq!(config.schedules.rollup.cron, "0 0 * * *");
    }

    #[test]
    fn test_config_reads_camel_case() {
        let config: Config = serde_json::from_str(
            r#"{"databasePath": "/tmp/s.db", "weekStart": "Sun", "resetMonthOnFirst": false,
                "schedules": {"rollup": {"enabled": false, "cron": "5 0 * * *", "timezone": "UTC"}}}"#,
        )
        .unwrap();
        assert_eq!(config.database_path.as_deref(), Some("/tmp/s.db"));
        assert_eq!(config.week_start, Weekday::Sun);
        assert!(!config.reset_month_on_first);
        assert!(!config.schedules.rollup.enabled);
    }

    #[test]
    fn test_inbound_message_defaults_to_user() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"text": "+1 a 1/2 b 1G", "senderDisplayName": "Ann"}"#)
                .unwrap();
        assert_eq!(msg.sender_kind, SenderKind::User);

        let bot: InboundMessage = serde_json::from_str(
            r#"{"text": "hi", "senderDisplayName": "Board", "senderKind": "bot"}"#,
        )
        .unwrap();
        assert_eq!(bot.sender_kind, SenderKind::Bot);
    }

    #[test]
    fn test_entry_matches_case_insensitively() {
        let entry = LeaderboardEntry {
            rep_name: "Alice Smith".to_string(),
            today: 0,
            week: 0,
            month: 0,
            lifetime: 0,
            last_update: String::new(),
        };
        assert!(entry.matches("alice smith"));
        assert!(entry.matches("ALICE SMITH"));
        assert!(!entry.matches("Alice"));
    }
}
