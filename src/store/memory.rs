//! In-memory tables. Used by tests and for dry runs.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{LeaderboardStore, SalesLogStore};
use crate::error::StoreError;
use crate::types::Row;

#[derive(Debug, Default)]
pub struct MemoryStore {
    leaderboard: Mutex<Vec<Row>>,
    sales_log: Mutex<Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing leaderboard rows.
    pub fn with_leaderboard(rows: Vec<Row>) -> Self {
        Self {
            leaderboard: Mutex::new(rows),
            sales_log: Mutex::new(Vec::new()),
        }
    }

    /// Start with existing sales log rows.
    pub fn with_sales_log(rows: Vec<Row>) -> Self {
        Self {
            leaderboard: Mutex::new(Vec::new()),
            sales_log: Mutex::new(rows),
        }
    }

    /// Start with both tables seeded.
    pub fn with_tables(leaderboard: Vec<Row>, sales_log: Vec<Row>) -> Self {
        Self {
            leaderboard: Mutex::new(leaderboard),
            sales_log: Mutex::new(sales_log),
        }
    }

    pub fn leaderboard_rows(&self) -> Vec<Row> {
        self.leaderboard.lock().clone()
    }

    pub fn sales_log_rows(&self) -> Vec<Row> {
        self.sales_log.lock().clone()
    }
}

#[async_trait]
impl LeaderboardStore for MemoryStore {
    async fn read_all(&self) -> Result<Vec<Row>, StoreError> {
        Ok(self.leaderboard.lock().clone())
    }

    async fn write_all(&self, rows: Vec<Row>) -> Result<(), StoreError> {
        *self.leaderboard.lock() = rows;
        Ok(())
    }
}

#[async_trait]
impl SalesLogStore for MemoryStore {
    async fn append(&self, row: Row) -> Result<(), StoreError> {
        self.sales_log.lock().push(row);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Row>, StoreError> {
        Ok(self.sales_log.lock().clone())
    }
}
