//! SQLite-backed tables.
//!
//! The database lives at `~/.salesboard/salesboard.db` unless the config
//! points elsewhere. Cells are stored as text so rows round-trip exactly as
//! they would through a spreadsheet.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use super::{LeaderboardStore, SalesLogStore};
use crate::error::StoreError;
use crate::types::{Row, LEADERBOARD_HEADER, SALES_LOG_HEADER};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `~/.salesboard/salesboard.db` and apply the schema.
    pub fn open() -> Result<Self, StoreError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        crate::migrations::run_migrations(&conn).map_err(StoreError::Migration)?;

        log::debug!("Opened sales database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Resolve the default database path: `~/.salesboard/salesboard.db`.
    fn db_path() -> Result<PathBuf, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::HomeDirNotFound)?;
        Ok(home.join(".salesboard").join("salesboard.db"))
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    fn with_transaction<F, T>(conn: &Connection, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(conn) {
            Ok(val) => {
                conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }
}

/// Pad or truncate a row to the table's column count.
fn fit_row(mut row: Row, width: usize) -> Row {
    row.resize(width, String::new());
    row
}

#[async_trait]
impl LeaderboardStore for SqliteStore {
    async fn read_all(&self) -> Result<Vec<Row>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT rep, today, week, month, lifetime, last_update
             FROM leaderboard ORDER BY position",
        )?;
        let rows = stmt
            .query_map([], |row| {
                (0..LEADERBOARD_HEADER.len())
                    .map(|i| row.get::<_, String>(i))
                    .collect::<Result<Row, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn write_all(&self, rows: Vec<Row>) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        Self::with_transaction(&conn, |conn| {
            conn.execute("DELETE FROM leaderboard", [])?;
            let mut stmt = conn.prepare(
                "INSERT INTO leaderboard (position, rep, today, week, month, lifetime, last_update)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, row) in rows.into_iter().enumerate() {
                let position = position as i64;
                let r = fit_row(row, LEADERBOARD_HEADER.len());
                stmt.execute(params![position, r[0], r[1], r[2], r[3], r[4], r[5]])?;
            }
            Ok(())
        })
    }
}

#[async_trait]
impl SalesLogStore for SqliteStore {
    async fn append(&self, row: Row) -> Result<(), StoreError> {
        let r = fit_row(row, SALES_LOG_HEADER.len());
        self.conn.lock().execute(
            "INSERT INTO sales_log (timestamp, rep, customer, sale_date, install_date,
             provider, speed, today_reported)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![r[0], r[1], r[2], r[3], r[4], r[5], r[6], r[7]],
        )?;
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Row>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT timestamp, rep, customer, sale_date, install_date, provider, speed,
             today_reported
             FROM sales_log ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                (0..SALES_LOG_HEADER.len())
                    .map(|i| row.get::<_, String>(i))
                    .collect::<Result<Row, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
