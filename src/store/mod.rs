//! Tabular stores behind the leaderboard and the sales log.
//!
//! Both tables are consumed as whole-row text, the way a spreadsheet exposes
//! them. Typed values only exist on this side of `rows`; the backends never
//! interpret a cell.

mod memory;
pub mod rows;
mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::Row;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Leaderboard table: `[Rep, Today, Week, Month, Lifetime, LastUpdate]`.
#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// All data rows in table order, header excluded.
    async fn read_all(&self) -> Result<Vec<Row>, StoreError>;

    /// Replace every data row. Either the old or the new table survives a failure.
    async fn write_all(&self, rows: Vec<Row>) -> Result<(), StoreError>;
}

/// Append-only sales log: `[Timestamp, Rep, Customer, SaleDate, InstallDate, Provider, Speed, TodayReported]`.
#[async_trait]
pub trait SalesLogStore: Send + Sync {
    async fn append(&self, row: Row) -> Result<(), StoreError>;

    /// All data rows in append order, header excluded.
    async fn scan(&self) -> Result<Vec<Row>, StoreError>;
}
