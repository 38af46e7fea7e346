//! libSQL connection that backs the record store

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Pragmas applied on every open. Every acknowledged write must be on disk,
/// so the WAL journal is paired with `synchronous = FULL`.
const DURABILITY_PRAGMAS: [&str; 3] = [
    "PRAGMA journal_mode = WAL;",
    "PRAGMA synchronous = FULL;",
    "PRAGMA busy_timeout = 5000;",
];

const IN_MEMORY: &str = ":memory:";

/// A migrated local libSQL database
pub struct Database {
    // Dropping the handle closes the connection
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file at `path` and migrate it
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let location = path.as_ref().to_string_lossy().to_string();
        let database = Self::connect(&location).await?;
        tracing::debug!("Opened record database at {}", location);
        Ok(database)
    }

    /// Open a throwaway in-memory database
    pub async fn open_in_memory() -> Result<Self> {
        Self::connect(IN_MEMORY).await
    }

    async fn connect(location: &str) -> Result<Self> {
        let db = Builder::new_local(location).build().await?;
        let conn = db.connect()?;

        for pragma in DURABILITY_PRAGMAS {
            match conn.query(pragma, ()).await {
                Ok(_) => {}
                // In-memory databases have no journal to configure
                Err(error) if location == IN_MEMORY => {
                    tracing::debug!("{} not applied to {}: {}", pragma, location, error);
                }
                Err(error) => {
                    tracing::error!("{} failed on {}: {}", pragma, location, error);
                    return Err(error.into());
                }
            }
        }
        migrations::run(&conn).await?;

        Ok(Self { _db: db, conn })
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM records", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let count: i64 = row.get(0).unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_file_creates_schema() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("records.db");

        let db = Database::open(&db_path).await.unwrap();
        db.connection()
            .execute(
                "INSERT INTO records (key, value, updated_at) VALUES ('k', '1', 0)",
                (),
            )
            .await
            .unwrap();
        drop(db);

        // Reopening must not re-run migrations destructively
        let reopened = Database::open(&db_path).await.unwrap();
        let mut rows = reopened
            .connection()
            .query("SELECT value FROM records WHERE key = 'k'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let value: String = row.get(0).unwrap();
        assert_eq!(value, "1");
    }

    async fn pragma_value(db: &Database, pragma: &str) -> String {
        let mut rows = db.connection().query(pragma, ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        row.get_value(0)
            .map(|value| match value {
                libsql::Value::Integer(number) => number.to_string(),
                libsql::Value::Text(text) => text,
                other => format!("{other:?}"),
            })
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_file_database_is_durable() {
        let tmp = tempdir().unwrap();
        let db = Database::open(tmp.path().join("records.db")).await.unwrap();

        assert_eq!(pragma_value(&db, "PRAGMA journal_mode;").await, "wal");
        // FULL
        assert_eq!(pragma_value(&db, "PRAGMA synchronous;").await, "2");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unopenable_path_is_an_error() {
        let tmp = tempdir().unwrap();
        let missing_dir = tmp.path().join("missing").join("records.db");
        assert!(Database::open(&missing_dir).await.is_err());
    }
}
