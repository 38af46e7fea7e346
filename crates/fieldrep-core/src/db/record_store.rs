//! Local record store: durable key to JSON mapping

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use super::Database;
use crate::{Error, Result};

/// Key-namespaced persistent store of JSON blobs.
///
/// Every operation is durable when it returns. There is no multi-key
/// atomicity: callers must tolerate one key being written while a write to
/// another key fails.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove `key`; removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// List stored keys starting with `prefix`, sorted
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Read and deserialize the value under `key`
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn RecordStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serialize and store `value` under `key`
pub async fn save_json<T: Serialize + Sync>(
    store: &dyn RecordStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let value = serde_json::to_value(value)?;
    store.set(key, &value).await
}

/// libSQL-backed record store
#[derive(Clone)]
pub struct LibSqlRecordStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlRecordStore {
    /// Open the store at the given filesystem path.
    ///
    /// A file that is not a valid database is moved aside and a fresh store
    /// is created in its place.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match Database::open(&db_path).await {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Record database at {} is unreadable: {}. Moving it aside and starting fresh.",
                    db_path.display(),
                    error
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path).await?
            }
            Err(error) => return Err(error),
        };

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    fn is_corrupted_db_error(error: &Error) -> bool {
        let message = error.to_string().to_ascii_lowercase();
        message.contains("file is not a database") || message.contains("malformed")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let base_name = db_path
                .file_name()
                .map_or_else(|| "fieldrep.db".into(), |name| name.to_string_lossy());
            let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved corrupted record database from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        let Some(parent) = db_path.parent() else {
            return Ok(());
        };
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };

        // WAL and shared-memory sidecars belong to the old file
        for suffix in ["-wal", "-shm"] {
            let sidecar = parent.join(format!("{base_name}{suffix}"));
            if sidecar.exists() {
                std::fs::remove_file(&sidecar)?;
                tracing::warn!("Removed stale sidecar file {}", sidecar.display());
            }
        }

        Ok(())
    }
}

#[async_trait]
impl RecordStore for LibSqlRecordStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query("SELECT value FROM records WHERE key = ?1", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let raw: String = row.get(0)?;
            Ok(Some(serde_json::from_str(&raw)?))
        } else {
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        let now = chrono::Utc::now().timestamp_millis();

        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                libsql::params![key, serialized, now],
            )
            .await?;
        tracing::trace!("Stored record {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM records WHERE key = ?1", [key])
            .await?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT key FROM records WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
                [prefix],
            )
            .await?;

        let mut keys = Vec::new();
        while let Some(row) = rows.next().await? {
            keys.push(row.get::<String>(0)?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn set_get_remove_roundtrip() {
        let store = LibSqlRecordStore::open_in_memory().await.unwrap();

        assert_eq!(store.get("Reports_u1").await.unwrap(), None);

        store
            .set("Reports_u1", &json!([{ "id": "r1" }]))
            .await
            .unwrap();
        assert_eq!(
            store.get("Reports_u1").await.unwrap(),
            Some(json!([{ "id": "r1" }]))
        );

        store.set("Reports_u1", &json!([])).await.unwrap();
        assert_eq!(store.get("Reports_u1").await.unwrap(), Some(json!([])));

        store.remove("Reports_u1").await.unwrap();
        store.remove("Reports_u1").await.unwrap();
        assert_eq!(store.get("Reports_u1").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn keys_with_prefix_treats_underscore_literally() {
        let store = LibSqlRecordStore::open_in_memory().await.unwrap();
        store.set("Reports_a", &json!([])).await.unwrap();
        store.set("Reports_b", &json!([])).await.unwrap();
        store.set("ReportsXc", &json!([])).await.unwrap();
        store.set("SyncQueue", &json!([])).await.unwrap();

        let keys = store.keys_with_prefix("Reports_").await.unwrap();
        assert_eq!(keys, vec!["Reports_a".to_string(), "Reports_b".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn typed_helpers_roundtrip() {
        let store = LibSqlRecordStore::open_in_memory().await.unwrap();
        save_json(&store, "appLanguage", &"fr".to_string())
            .await
            .unwrap();
        let language: Option<String> = load_json(&store, "appLanguage").await.unwrap();
        assert_eq!(language.as_deref(), Some("fr"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn values_survive_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("fieldrep.db");

        {
            let store = LibSqlRecordStore::open_path(&db_path).await.unwrap();
            store.set("UserData", &json!({ "uid": "u1" })).await.unwrap();
        }

        let store = LibSqlRecordStore::open_path(&db_path).await.unwrap();
        assert_eq!(
            store.get("UserData").await.unwrap(),
            Some(json!({ "uid": "u1" }))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn corrupted_file_is_quarantined() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("fieldrep.db");
        std::fs::write(&db_path, vec![0x42_u8; 4096]).unwrap();

        let store = LibSqlRecordStore::open_path(&db_path).await.unwrap();
        store.set("SyncQueue", &json!([])).await.unwrap();

        let backups = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("fieldrep.db.corrupt-")
            })
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn detects_corrupted_database_errors() {
        assert!(LibSqlRecordStore::is_corrupted_db_error(&Error::Storage(
            "SQLite failure: file is not a database".to_string()
        )));
        assert!(!LibSqlRecordStore::is_corrupted_db_error(
            &Error::InvalidInput("bad key".to_string())
        ));
    }
}
