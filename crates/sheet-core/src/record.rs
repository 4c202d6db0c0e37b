//! Records and Field Maps
//!
//! The data shapes that flow between collectors, the sequencer and the store.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field name to captured value
pub type FieldMap = BTreeMap<String, String>;

/// A persisted convenience record owned by one collector
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorRecord {
    /// Store key; saves from the same collector overwrite this entry
    pub id: Uuid,

    /// Captured fields
    pub fields: FieldMap,

    pub time_created: DateTime<Utc>,
    pub time_last_modified: DateTime<Utc>,
    pub time_last_used: DateTime<Utc>,
    pub times_used: u32,
}

impl CollectorRecord {
    /// Create a fresh, never-used record seeded with `initial` fields
    pub fn fresh(initial: FieldMap) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            fields: initial,
            time_created: now,
            time_last_modified: now,
            time_last_used: now,
            times_used: 0,
        }
    }

    /// Shallow-merge `fields` over the stored ones (new values win)
    pub fn merge(&mut self, fields: FieldMap) {
        self.fields.extend(fields);
        self.time_last_modified = Utc::now();
    }

    /// Record one more use
    pub fn touch(&mut self) {
        self.time_last_used = Utc::now();
        self.times_used = self.times_used.saturating_add(1);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Data aggregated across all steps of a session
///
/// Later steps overwrite same-named keys written by earlier ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectedData(FieldMap);

impl CollectedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one step's fields in, overwriting earlier values
    pub fn absorb(&mut self, fields: FieldMap) {
        self.0.extend(fields);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn into_inner(self) -> FieldMap {
        self.0
    }
}

impl From<FieldMap> for CollectedData {
    fn from(map: FieldMap) -> Self {
        Self(map)
    }
}

/// One step's input surface
///
/// Tracks which fields the user set explicitly, as opposed to defaults
/// prefilled from a stored record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormData {
    values: FieldMap,
    touched: BTreeSet<String>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// User input
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        self.touched.insert(field.clone());
        self.values.insert(field, value.into());
    }

    /// Default value; never overrides something the user already typed
    pub fn prefill(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        if !self.touched.contains(&field) {
            self.values.insert(field, value.into());
        }
    }

    pub fn remove(&mut self, field: &str) {
        self.values.remove(field);
        self.touched.remove(field);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Checkbox semantics: present and equal to "on"
    pub fn is_on(&self, field: &str) -> bool {
        self.get(field) == Some("on")
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.touched.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Build a [`FieldMap`] from pairs
pub fn fields<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> FieldMap
where
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_record() {
        let record = CollectorRecord::fresh(fields([("foo", "bar")]));
        assert_eq!(record.get("foo"), Some("bar"));
        assert_eq!(record.times_used, 0);
        assert_eq!(record.time_created, record.time_last_modified);
    }

    #[test]
    fn test_merge_is_shallow_and_new_wins() {
        let mut record = CollectorRecord::fresh(fields([("a", "1"), ("b", "2")]));
        record.merge(fields([("a", "9"), ("c", "3")]));
        assert_eq!(record.fields, fields([("a", "9"), ("b", "2"), ("c", "3")]));
    }

    #[test]
    fn test_prefill_does_not_override_user_input() {
        let mut form = FormData::new();
        form.set("city", "Berlin");
        form.prefill("city", "Paris");
        form.prefill("country", "DE");

        assert_eq!(form.get("city"), Some("Berlin"));
        assert_eq!(form.get("country"), Some("DE"));
        assert!(form.is_touched("city"));
        assert!(!form.is_touched("country"));
    }

    #[test]
    fn test_is_on() {
        let mut form = FormData::new();
        assert!(!form.is_on("saveDetails"));
        form.set("saveDetails", "off");
        assert!(!form.is_on("saveDetails"));
        form.set("saveDetails", "on");
        assert!(form.is_on("saveDetails"));
    }

    #[test]
    fn test_collected_data_serializes_flat() {
        let mut data = CollectedData::new();
        data.absorb(fields([("a", "1")]));
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json, serde_json::json!({ "a": "1" }));
    }
}
