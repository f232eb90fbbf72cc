use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::open_connection;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key-value store holding the persisted JSON blobs.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteStateStore {
    db_path: PathBuf,
}

impl SqliteStateStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = open_connection(&self.db_path)?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = open_connection(&self.db_path)?;
        connection.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let values = self
            .values
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("state store lock poisoned: {error}")))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut values = self
            .values
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("state store lock poisoned: {error}")))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::initialize_database;

    struct TempDatabase {
        path: PathBuf,
    }

    impl TempDatabase {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "tomato-focus-store-{}-{}.sqlite",
                name,
                std::process::id()
            ));
            let _ = std::fs::remove_file(&path);
            initialize_database(&path).expect("initialize database");
            Self { path }
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    #[tokio::test]
    async fn sqlite_store_overwrites_existing_key() {
        let database = TempDatabase::new("overwrite");
        let store = SqliteStateStore::new(&database.path);

        assert_eq!(store.get("timerState").await.expect("get missing"), None);
        store.set("timerState", "{\"a\":1}").await.expect("first set");
        store.set("timerState", "{\"a\":2}").await.expect("second set");

        assert_eq!(
            store.get("timerState").await.expect("get stored"),
            Some("{\"a\":2}".to_string())
        );
    }

    #[tokio::test]
    async fn sqlite_store_keeps_keys_independent() {
        let database = TempDatabase::new("independent");
        let store = SqliteStateStore::new(&database.path);

        store.set("timerState", "timer").await.expect("set timer");
        store.set("blockedSites", "[]").await.expect("set sites");

        assert_eq!(store.get("timerState").await.expect("get"), Some("timer".to_string()));
        assert_eq!(store.get("blockedSites").await.expect("get"), Some("[]".to_string()));
    }

    #[tokio::test]
    async fn in_memory_store_roundtrip() {
        let store = InMemoryStateStore::default();
        store.set("blockedSites", "[]").await.expect("set");
        assert_eq!(store.get("blockedSites").await.expect("get"), Some("[]".to_string()));
        assert_eq!(store.get("timerState").await.expect("get"), None);
    }
}
