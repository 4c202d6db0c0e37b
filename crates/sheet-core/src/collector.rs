//! Data Collectors
//!
//! A collector owns one schema-bounded slice of user input plus an optional
//! persisted record. Concrete collectors wrap a [`DataCollector`] and implement
//! [`Collector`], overriding hooks as needed.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{PersistenceError, ValidationFailure};
use crate::record::{CollectorRecord, FieldMap, FormData};
use crate::render::{ButtonLabels, Fragment};
use crate::request::PaymentRequest;
use crate::store::RecordStore;

/// Checkbox the user ticks to have their details remembered
pub const SAVE_DETAILS_FIELD: &str = "saveDetails";

/// Shared state and persistence plumbing for a collector
pub struct DataCollector {
    schema: BTreeSet<String>,
    table: Option<String>,
    store: Arc<dyn RecordStore>,
    initial: FieldMap,
    record: Option<CollectorRecord>,
}

impl DataCollector {
    pub fn new<I, S>(schema: I, store: Arc<dyn RecordStore>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.into_iter().map(Into::into).collect(),
            table: None,
            store,
            initial: FieldMap::new(),
            record: None,
        }
    }

    /// Persist to `table`
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        let table = table.into();
        self.table = (!table.is_empty()).then_some(table);
        self
    }

    /// Fields seeded into a fresh record
    pub fn with_initial_data(mut self, initial: FieldMap) -> Self {
        self.initial = initial;
        self
    }

    pub fn schema(&self) -> &BTreeSet<String> {
        &self.schema
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn record(&self) -> Option<&CollectorRecord> {
        self.record.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Load the most recently used record, or synthesize a fresh one
    ///
    /// Store faults are logged and fall back to a fresh record.
    pub async fn load(&mut self) {
        let Some(table) = self.table.clone() else {
            return;
        };

        match self.load_from(&table).await {
            Ok(Some(record)) => {
                tracing::debug!(table = %table, times_used = record.times_used, "Loaded stored record");
                self.record = Some(record);
            }
            Ok(None) => {
                self.record = Some(CollectorRecord::fresh(self.initial.clone()));
            }
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "Could not load stored record");
                self.record = Some(CollectorRecord::fresh(self.initial.clone()));
            }
        }
    }

    async fn load_from(&self, table: &str) -> Result<Option<CollectorRecord>, PersistenceError> {
        self.store.ensure_open().await?;
        if self.store.count(table).await? == 0 {
            return Ok(None);
        }
        self.store.most_recently_used(table).await
    }

    /// This collector's non-empty fields from the input surface
    pub fn to_fields(&self, input: &FormData) -> FieldMap {
        input
            .iter()
            .filter(|(key, _)| self.schema.contains(*key))
            .filter(|(_, value)| !value.is_empty())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Persist `fields` over the prior record, if the user opted in
    pub async fn save(&mut self, input: &FormData, fields: FieldMap) -> Result<(), PersistenceError> {
        let Some(table) = self.table.as_deref() else {
            return Ok(());
        };
        if !input.is_on(SAVE_DETAILS_FIELD) {
            return Ok(());
        }

        let mut record = self
            .record
            .clone()
            .unwrap_or_else(|| CollectorRecord::fresh(self.initial.clone()));
        record.merge(fields);
        record.touch();

        self.store.ensure_open().await?;
        self.store.put(table, &record).await?;
        tracing::debug!(table = %table, "Saved record");
        self.record = Some(record);
        Ok(())
    }

    /// Stored values for this collector's schema, used to prefill the form
    pub fn defaults(&self) -> FieldMap {
        self.record
            .as_ref()
            .map(|r| {
                r.fields
                    .iter()
                    .filter(|(k, _)| self.schema.contains(*k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Collector trait - implement to add a new kind of step content
#[async_trait]
pub trait Collector: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    fn data(&self) -> &DataCollector;

    fn data_mut(&mut self) -> &mut DataCollector;

    /// Resolve once prior data has been loaded
    async fn ready(&mut self) {
        self.data_mut().load().await;
    }

    /// Fields that must be non-empty for the step to be valid
    fn required_fields(&self) -> &[&'static str] {
        &[]
    }

    /// The field that records an explicit user choice
    fn choice_field(&self) -> Option<&str> {
        None
    }

    /// Read this collector's fields from the input surface
    fn to_fields(&self, input: &FormData) -> FieldMap {
        self.data().to_fields(input)
    }

    /// Validate the input surface
    fn validate(&self, input: &FormData) -> Result<(), ValidationFailure> {
        for field in self.required_fields() {
            if input.get(field).is_none_or(str::is_empty) {
                return Err(ValidationFailure::MissingField((*field).to_string()));
            }
        }
        Ok(())
    }

    /// Persist the current input, if the user opted in
    async fn save(&mut self, input: &FormData) -> Result<(), PersistenceError> {
        let fields = self.to_fields(input);
        self.data_mut().save(input, fields).await
    }

    /// Values to prefill the input surface with
    fn defaults(&self) -> FieldMap {
        self.data().defaults()
    }

    /// New request context (amounts, methods)
    fn update(&mut self, _request: &PaymentRequest) {}

    /// The step holding this collector committed `fields`
    fn continued(&mut self, _fields: &FieldMap) {}

    /// Drop any in-progress state
    fn reset(&mut self) {}

    fn render(&self, request: &PaymentRequest, input: &FormData) -> Fragment;

    fn button_labels(&self) -> ButtonLabels {
        ButtonLabels::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fields;
    use crate::store::MemoryStore;

    struct Notes {
        data: DataCollector,
    }

    #[async_trait]
    impl Collector for Notes {
        fn name(&self) -> &str {
            "notes"
        }

        fn data(&self) -> &DataCollector {
            &self.data
        }

        fn data_mut(&mut self) -> &mut DataCollector {
            &mut self.data
        }

        fn required_fields(&self) -> &[&'static str] {
            &["note"]
        }

        fn render(&self, _request: &PaymentRequest, input: &FormData) -> Fragment {
            Fragment::new(input.get("note").unwrap_or_default().to_string())
        }
    }

    fn notes(store: Arc<dyn RecordStore>) -> Notes {
        Notes {
            data: DataCollector::new(["note", "foo"], store)
                .with_table("notes")
                .with_initial_data(fields([("foo", "bar")])),
        }
    }

    #[tokio::test]
    async fn test_fresh_record_from_initial_data() {
        let mut collector = notes(Arc::new(MemoryStore::new()));
        collector.ready().await;

        let record = collector.data().record().unwrap();
        assert_eq!(record.get("foo"), Some("bar"));
        assert_eq!(record.times_used, 0);
        assert!(record.time_created <= record.time_last_modified);
    }

    #[tokio::test]
    async fn test_loads_existing_record() {
        let store = Arc::new(MemoryStore::new());
        let mut stored = CollectorRecord::fresh(fields([("note", "remembered")]));
        stored.times_used = 3;
        store.insert("notes", stored.clone());

        let mut collector = notes(store);
        collector.ready().await;

        assert_eq!(collector.data().record(), Some(&stored));
        assert_eq!(collector.defaults(), fields([("note", "remembered")]));
    }

    #[tokio::test]
    async fn test_unavailable_store_falls_back_to_fresh() {
        let mut collector = notes(Arc::new(MemoryStore::unavailable()));
        collector.ready().await;
        assert_eq!(collector.data().record().unwrap().get("foo"), Some("bar"));
    }

    #[test]
    fn test_to_fields_filters_schema_and_empty() {
        let collector = notes(Arc::new(MemoryStore::new()));
        let mut input = FormData::new();
        input.set("note", "hello");
        input.set("foo", "");
        input.set("unrelated", "x");

        assert_eq!(collector.to_fields(&input), fields([("note", "hello")]));
    }

    #[tokio::test]
    async fn test_save_without_opt_in_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let mut collector = notes(store.clone());
        collector.ready().await;

        let mut input = FormData::new();
        input.set("note", "hello");
        collector.save(&input).await.unwrap();

        assert_eq!(store.count("notes").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_merges_and_overwrites_same_record() {
        let store = Arc::new(MemoryStore::new());
        let mut collector = notes(store.clone());
        collector.ready().await;

        let mut input = FormData::new();
        input.set(SAVE_DETAILS_FIELD, "on");
        input.set("note", "first");
        collector.save(&input).await.unwrap();
        input.set("note", "second");
        collector.save(&input).await.unwrap();

        let records = store.records("notes");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("note"), Some("second"));
        assert_eq!(records[0].get("foo"), Some("bar"));
        assert_eq!(records[0].times_used, 2);
    }

    #[tokio::test]
    async fn test_save_surfaces_persistence_error() {
        let mut collector = notes(Arc::new(MemoryStore::unavailable()));
        collector.ready().await;

        let mut input = FormData::new();
        input.set(SAVE_DETAILS_FIELD, "on");
        input.set("note", "hello");
        assert!(matches!(
            collector.save(&input).await,
            Err(PersistenceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_default_validate() {
        let collector = notes(Arc::new(MemoryStore::new()));
        let mut input = FormData::new();
        assert_eq!(
            collector.validate(&input),
            Err(ValidationFailure::MissingField("note".into()))
        );
        input.set("note", "x");
        assert!(collector.validate(&input).is_ok());
    }
}
