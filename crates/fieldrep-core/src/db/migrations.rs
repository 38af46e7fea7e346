//! Versioned schema migrations for the record database

use crate::error::Result;
use libsql::Connection;

/// Ordered migrations; each entry runs once inside its own transaction
const MIGRATIONS: &[(i32, &[&str])] = &[(
    1,
    &[
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        // One JSON document per namespaced key
        "CREATE TABLE IF NOT EXISTS records (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )",
    ],
)];

pub fn latest_version() -> i32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

/// Bring the schema up to [`latest_version`]
pub async fn run(conn: &Connection) -> Result<()> {
    let current = schema_version(conn).await?;

    for (version, statements) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
        apply(conn, *version, statements).await?;
        tracing::info!("Applied record schema migration v{}", version);
    }

    tracing::debug!("Record database schema at version {}", latest_version());
    Ok(())
}

async fn schema_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            (),
        )
        .await?;
    let has_table = match rows.next().await? {
        Some(row) => row.get::<i64>(0)? > 0,
        None => false,
    };
    if !has_table {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN IMMEDIATE", ()).await?;

    let result = async {
        for statement in statements {
            conn.execute(*statement, ()).await?;
        }
        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            libsql::params![version, chrono::Utc::now().timestamp_millis()],
        )
        .await?;
        Ok::<(), libsql::Error>(())
    }
    .await;

    match result {
        Ok(()) => {
            conn.execute("COMMIT", ()).await?;
            Ok(())
        }
        Err(error) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(error.into())
        }
    }
}
