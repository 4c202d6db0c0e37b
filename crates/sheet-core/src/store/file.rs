//! JSON File Record Store
//!
//! Keeps every table in a single JSON document on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::{RecordStore, StoreResult, latest};
use crate::error::PersistenceError;
use crate::record::CollectorRecord;

type Tables = BTreeMap<String, BTreeMap<Uuid, CollectorRecord>>;

/// File-backed record store
pub struct JsonFileStore {
    path: PathBuf,
    tables: RwLock<Tables>,
    open: AtomicBool,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tables: RwLock::new(BTreeMap::new()),
            open: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PersistenceError::Closed)
        }
    }

    async fn flush(&self) -> StoreResult<()> {
        // Serialize under the lock, write after releasing it
        let json = {
            let tables = self.tables.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            serde_json::to_vec_pretty(&*tables)?
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn open(&self) -> StoreResult<()> {
        let loaded: Tables = match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Tables::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| PersistenceError::Corrupt(format!("{}: {}", self.path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::new(),
            Err(e) => return Err(PersistenceError::Unavailable(e.to_string())),
        };

        *self.tables.write().unwrap_or_else(std::sync::PoisonError::into_inner) = loaded;
        self.open.store(true, Ordering::SeqCst);
        tracing::debug!(path = %self.path.display(), "Opened record store");
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn count(&self, table: &str) -> StoreResult<usize> {
        self.check_open()?;
        let tables = self.tables.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(tables.get(table).map_or(0, BTreeMap::len))
    }

    async fn most_recently_used(&self, table: &str) -> StoreResult<Option<CollectorRecord>> {
        self.check_open()?;
        let tables = self.tables.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(tables.get(table).and_then(|t| latest(t.values())))
    }

    async fn put(&self, table: &str, record: &CollectorRecord) -> StoreResult<()> {
        self.check_open()?;
        {
            let mut tables = self.tables.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            tables
                .entry(table.to_string())
                .or_default()
                .insert(record.id, record.clone());
        }
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fields;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("sheet-store-{}.json", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let store = JsonFileStore::new(temp_path());
        store.open().await.unwrap();
        assert_eq!(store.count("addresses").await.unwrap(), 0);
        assert!(store.most_recently_used("addresses").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let path = temp_path();
        let record = CollectorRecord::fresh(fields([("city", "Lisbon")]));

        let store = JsonFileStore::new(&path);
        store.open().await.unwrap();
        store.put("addresses", &record).await.unwrap();
        store.close().await.unwrap();

        let reopened = JsonFileStore::new(&path);
        reopened.open().await.unwrap();
        let loaded = reopened.most_recently_used("addresses").await.unwrap().unwrap();
        assert_eq!(loaded, record);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let path = temp_path();
        std::fs::write(&path, b"not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.open().await, Err(PersistenceError::Corrupt(_))));

        let _ = std::fs::remove_file(path);
    }
}
