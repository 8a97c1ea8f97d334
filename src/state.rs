//! Application state and configuration loading.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

use crate::notification::{Notifier, StdoutNotifier, WebhookNotifier};
use crate::store::{LeaderboardStore, SalesLogStore, SqliteStore};
use crate::types::{Config, Timestamp};

/// Everything a request or a scheduled job needs, passed explicitly.
pub struct AppState {
    pub config: Config,
    pub timezone: Tz,
    pub leaderboard: Arc<dyn LeaderboardStore>,
    pub sales_log: Arc<dyn SalesLogStore>,
    pub notifier: Arc<dyn Notifier>,
    /// Held across every full-table rewrite so ingest and rollup never interleave.
    pub write_lock: tokio::sync::Mutex<()>,
    last_scheduled_run: Mutex<Option<DateTime<Utc>>>,
}

impl AppState {
    pub fn new(
        config: Config,
        leaderboard: Arc<dyn LeaderboardStore>,
        sales_log: Arc<dyn SalesLogStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, String> {
        let timezone = parse_timezone(&config.timezone)?;
        Ok(Self {
            config,
            timezone,
            leaderboard,
            sales_log,
            notifier,
            write_lock: tokio::sync::Mutex::new(()),
            last_scheduled_run: Mutex::new(None),
        })
    }

    /// Build state from config: SQLite store and the configured notifier.
    pub fn from_config(config: Config) -> Result<Self, String> {
        let store = match &config.database_path {
            Some(path) => SqliteStore::open_at(PathBuf::from(path)),
            None => SqliteStore::open(),
        }
        .map_err(|e| format!("Failed to open sales database: {}", e))?;
        let store = Arc::new(store);

        let notifier: Arc<dyn Notifier> = match &config.webhook_url {
            Some(url) if !url.trim().is_empty() => Arc::new(WebhookNotifier::new(url.trim())),
            _ => Arc::new(StdoutNotifier),
        };

        Self::new(config, store.clone(), store, notifier)
    }

    /// Current instant in the leaderboard's timezone.
    pub fn now(&self) -> Timestamp {
        local_now(&self.timezone)
    }

    pub fn get_last_scheduled_run(&self) -> Option<DateTime<Utc>> {
        *self.last_scheduled_run.lock()
    }

    pub fn set_last_scheduled_run(&self, at: DateTime<Utc>) {
        *self.last_scheduled_run.lock() = Some(at);
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|_| format!("Invalid timezone: {}", name))
}

/// `Utc::now()` shifted into `tz`, keeping the offset.
pub fn local_now(tz: &Tz) -> Timestamp {
    Utc::now().with_timezone(tz).fixed_offset()
}

/// Get the canonical config file path (~/.salesboard/config.json)
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".salesboard").join("config.json"))
}

/// Load configuration from ~/.salesboard/config.json, or defaults if absent.
pub fn load_config() -> Result<Config, String> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;

    let config: Config =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;

    parse_timezone(&config.timezone)?;
    parse_timezone(&config.schedules.rollup.timezone)?;

    Ok(config)
}
