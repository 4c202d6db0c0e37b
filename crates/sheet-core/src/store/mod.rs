//! Persistence Boundary
//!
//! A keyed-record store with one table per collector. Absence of a record is
//! "no prior data", never an error.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::record::CollectorRecord;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, PersistenceError>;

/// Record store trait (Strategy pattern)
///
/// One process-wide handle is shared by every collector. Opens are lazy and
/// not reference-counted.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether the store is currently open
    fn is_open(&self) -> bool;

    /// Open the store
    async fn open(&self) -> StoreResult<()>;

    /// Close the store
    async fn close(&self) -> StoreResult<()>;

    /// Number of records in a table
    async fn count(&self, table: &str) -> StoreResult<usize>;

    /// The record with the latest `time_last_used`, if any
    async fn most_recently_used(&self, table: &str) -> StoreResult<Option<CollectorRecord>>;

    /// Insert or overwrite a record, keyed by its id
    async fn put(&self, table: &str, record: &CollectorRecord) -> StoreResult<()>;

    /// Open the store unless it is already open
    async fn ensure_open(&self) -> StoreResult<()> {
        if !self.is_open() {
            self.open().await?;
        }
        Ok(())
    }
}

/// Pick the most recently used record from a table's contents
pub(crate) fn latest<'a>(records: impl Iterator<Item = &'a CollectorRecord>) -> Option<CollectorRecord> {
    records.max_by_key(|r| r.time_last_used).cloned()
}
