//! Error types for store access, notification delivery and job execution
//!
//! Errors are classified by how the caller reacts:
//! - Store failures abort the current operation (no retry, logged)
//! - Notification failures are logged and swallowed
//! - Configuration errors stop the scheduler from firing a job

use thiserror::Error;

/// Errors raised by the leaderboard and sales log stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// Errors raised while delivering an outbound chat message.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook rejected message with status {0}")]
    Rejected(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by scheduled and manual job execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ExecutionError {
    /// Returns true if running the same job again could succeed.
    ///
    /// A locked or busy database is transient; everything else needs an
    /// operator to change something first.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecutionError::Store(StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _))) => {
                matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
            }
            _ => false,
        }
    }
}
