//! In-Memory Record Store
//!
//! For tests and development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::{RecordStore, StoreResult, latest};
use crate::error::PersistenceError;
use crate::record::CollectorRecord;

type Tables = HashMap<String, HashMap<Uuid, CollectorRecord>>;

/// In-memory record store
pub struct MemoryStore {
    tables: RwLock<Tables>,
    open: AtomicBool,
    available: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            open: AtomicBool::new(false),
            available: true,
        }
    }

    /// A store that refuses to open
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Seed a record without going through `open`
    pub fn insert(&self, table: &str, record: CollectorRecord) {
        let mut tables = self.tables.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        tables
            .entry(table.to_string())
            .or_default()
            .insert(record.id, record);
    }

    /// Snapshot of a table's records, for inspection
    pub fn records(&self, table: &str) -> Vec<CollectorRecord> {
        let tables = self.tables.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        tables
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PersistenceError::Closed)
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn open(&self) -> StoreResult<()> {
        if !self.available {
            return Err(PersistenceError::Unavailable("memory store disabled".into()));
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn count(&self, table: &str) -> StoreResult<usize> {
        self.check_open()?;
        let tables = self.tables.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(tables.get(table).map_or(0, HashMap::len))
    }

    async fn most_recently_used(&self, table: &str) -> StoreResult<Option<CollectorRecord>> {
        self.check_open()?;
        let tables = self.tables.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(tables.get(table).and_then(|t| latest(t.values())))
    }

    async fn put(&self, table: &str, record: &CollectorRecord) -> StoreResult<()> {
        self.check_open()?;
        self.insert(table, record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fields;

    #[tokio::test]
    async fn test_closed_store_rejects_reads() {
        let store = MemoryStore::new();
        assert!(matches!(store.count("cards").await, Err(PersistenceError::Closed)));
        store.ensure_open().await.unwrap();
        assert_eq!(store.count("cards").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_overwrites_same_id() {
        let store = MemoryStore::new();
        store.open().await.unwrap();

        let mut record = CollectorRecord::fresh(fields([("city", "Oslo")]));
        store.put("addresses", &record).await.unwrap();
        record.merge(fields([("city", "Bergen")]));
        store.put("addresses", &record).await.unwrap();

        assert_eq!(store.count("addresses").await.unwrap(), 1);
        let loaded = store.most_recently_used("addresses").await.unwrap().unwrap();
        assert_eq!(loaded.get("city"), Some("Bergen"));
    }

    #[tokio::test]
    async fn test_most_recently_used_wins() {
        let store = MemoryStore::new();
        let older = CollectorRecord::fresh(fields([("name", "old")]));
        let mut newer = CollectorRecord::fresh(fields([("name", "new")]));
        newer.time_last_used = older.time_last_used + chrono::Duration::seconds(60);
        store.insert("addresses", newer);
        store.insert("addresses", older);

        store.open().await.unwrap();
        let loaded = store.most_recently_used("addresses").await.unwrap().unwrap();
        assert_eq!(loaded.get("name"), Some("new"));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = MemoryStore::unavailable();
        assert!(matches!(store.open().await, Err(PersistenceError::Unavailable(_))));
        assert!(!store.is_open());
    }
}
