//! Schema migration framework.
//!
//! Numbered SQL migrations are embedded at compile time via `include_str!`.
//! Each migration runs exactly once, tracked by the `schema_version` table.

use rusqlite::Connection;

struct Migration {
    version: i32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migrations/001_baseline.sql"),
}];

/// Create the `schema_version` table if it doesn't exist.
fn ensure_schema_version_table(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("Failed to create schema_version table: {}", e))
}

/// Return the highest applied migration version, or 0 if none.
fn current_version(conn: &Connection) -> Result<i32, String> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| format!("Failed to read schema version: {}", e))
}

/// Run all pending migrations.
///
/// Returns the number of migrations applied (0 if already up-to-date).
/// A database newer than the highest known migration is refused.
pub fn run_migrations(conn: &Connection) -> Result<usize, String> {
    apply(conn, MIGRATIONS)
}

/// Each migration and its version row commit together, so a failed step
/// leaves the schema at the previous version.
fn apply(conn: &Connection, migrations: &[Migration]) -> Result<usize, String> {
    ensure_schema_version_table(conn)?;

    let current = current_version(conn)?;
    let max_known = migrations.last().map(|m| m.version).unwrap_or(0);
    if current > max_known {
        return Err(format!(
            "Database schema version ({}) is newer than this build supports ({}). \
             Please update salesboard.",
            current, max_known
        ));
    }

    let mut applied = 0;
    for migration in migrations.iter().filter(|m| m.version > current) {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| format!("Failed to start migration v{}: {}", migration.version, e))?;
        tx.execute_batch(migration.sql)
            .map_err(|e| format!("Migration v{} failed: {}", migration.version, e))?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [migration.version],
        )
        .map_err(|e| format!("Failed to record migration v{}: {}", migration.version, e))?;
        tx.commit()
            .map_err(|e| format!("Failed to commit migration v{}: {}", migration.version, e))?;

        log::info!("Applied migration v{}", migration.version);
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_db() -> Connection {
        Connection::open_in_memory().expect("in-memory db")
    }

    #[test]
    fn test_fresh_db_applies_baseline() {
        let conn = mem_db();
        let applied = run_migrations(&conn).expect("migrations should succeed");
        assert_eq!(applied, 1);
        assert_eq!(current_version(&conn).expect("version query"), 1);

        conn.execute(
            "INSERT INTO leaderboard (position, rep, today, week, month, lifetime, last_update)
             VALUES (0, 'Alice', '1', '1', '1', '1', '2025-11-20')",
            [],
        )
        .expect("leaderboard should have all columns");

        conn.execute(
            "INSERT INTO sales_log (timestamp, rep, customer, sale_date, install_date,
             provider, speed, today_reported)
             VALUES ('t', 'Alice', 'Jane', '2025-11-20', '11/25', 'Kinetic', '1G', '1')",
            [],
        )
        .expect("sales_log should have all columns");
    }

    #[test]
    fn test_rerun_is_noop() {
        let conn = mem_db();
        run_migrations(&conn).expect("first run");
        let applied = run_migrations(&conn).expect("second run");
        assert_eq!(applied, 0);
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let conn = mem_db();
        run_migrations(&conn).expect("baseline");

        let broken = [
            Migration {
                version: 1,
                sql: "",
            },
            Migration {
                version: 2,
                sql: "CREATE TABLE rep_aliases (alias TEXT); SELECT nope FROM missing_table;",
            },
        ];
        let err = apply(&conn, &broken).unwrap_err();
        assert!(err.starts_with("Migration v2 failed"));
        assert_eq!(current_version(&conn).expect("version query"), 1);

        let leftover: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'rep_aliases'",
                [],
                |row| row.get(0),
            )
            .expect("sqlite_master query");
        assert_eq!(leftover, 0);
    }

    #[test]
    fn test_newer_schema_refused() {
        let conn = mem_db();
        run_migrations(&conn).expect("first run");
        conn.execute("INSERT INTO schema_version (version) VALUES (99)", [])
            .expect("bump version");
        let err = run_migrations(&conn).unwrap_err();
        assert!(err.contains("newer than this build"));
    }
}
