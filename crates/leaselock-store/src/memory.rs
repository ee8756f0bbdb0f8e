//! In-process store backend
//!
//! A DashMap-backed [`StoreClient`] for tests and single-process use.
//! Guarded operations evaluate their condition and apply the effect while
//! holding the key's map entry, so per-key conditional semantics match a
//! real conditional-write store.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::client::StoreClient;
use crate::condition::Condition;
use crate::error::{Result, StoreError};
use crate::value::Record;

/// In-memory conditional-write store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, Record>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Number of records currently stored
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are stored
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn conditional_put(&self, key: &str, record: Record, condition: &Condition) -> Result<()> {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if !condition.matches(Some(entry.get())) {
                    return Err(StoreError::ConditionFailed(key.to_string()));
                }
                entry.get_mut().extend(record);
            }
            Entry::Vacant(entry) => {
                if !condition.matches(None) {
                    return Err(StoreError::ConditionFailed(key.to_string()));
                }
                entry.insert(record);
            }
        }
        debug!("Conditional put applied for key '{}'", key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Record>> {
        Ok(self.records.get(key).map(|entry| entry.value().clone()))
    }

    async fn conditional_delete(&self, key: &str, condition: &Condition) -> Result<()> {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                if !condition.matches(Some(entry.get())) {
                    return Err(StoreError::ConditionFailed(key.to_string()));
                }
                entry.remove();
                debug!("Conditional delete applied for key '{}'", key);
                Ok(())
            }
            Entry::Vacant(_) => {
                if !condition.matches(None) {
                    return Err(StoreError::ConditionFailed(key.to_string()));
                }
                // Nothing to delete; the condition held against the absence.
                Ok(())
            }
        }
    }

    async fn consistent_count(&self, filter: &Condition, _projection: &[&str]) -> Result<usize> {
        // The map is the source of truth, so every read is already as
        // consistent as reads get. The projection hint is not needed.
        let count = self
            .records
            .iter()
            .filter(|entry| filter.matches(Some(entry.value())))
            .count();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttrValue;

    fn record(pairs: &[(&str, AttrValue)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn exists(key: &str) -> Condition {
        Condition::Eq("key".into(), key.into())
    }

    #[tokio::test]
    async fn test_put_creates_when_vacant() {
        let store = MemoryStore::new();
        let rec = record(&[("key", AttrValue::from("a")), ("expiry", AttrValue::N(10))]);

        store
            .conditional_put("a", rec, &Condition::NotExists("key".into()))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.get("a").await.unwrap().unwrap();
        assert_eq!(stored.get("expiry"), Some(&AttrValue::N(10)));
    }

    #[tokio::test]
    async fn test_put_rejected_leaves_record_untouched() {
        let store = MemoryStore::new();
        let rec = record(&[("key", AttrValue::from("a")), ("owner", AttrValue::from("x"))]);
        store
            .conditional_put("a", rec, &Condition::NotExists("key".into()))
            .await
            .unwrap();

        let overwrite = record(&[("owner", AttrValue::from("y"))]);
        let err = store
            .conditional_put("a", overwrite, &Condition::Eq("owner".into(), "z".into()))
            .await
            .unwrap_err();

        assert!(err.is_condition_failure());
        let stored = store.get("a").await.unwrap().unwrap();
        assert_eq!(stored.get("owner"), Some(&AttrValue::from("x")));
    }

    #[tokio::test]
    async fn test_put_merges_into_existing_record() {
        let store = MemoryStore::new();
        let initial = record(&[
            ("key", AttrValue::from("a")),
            ("set_at", AttrValue::from("2026-01-01T00:00:00Z")),
            ("heartbeats", AttrValue::N(0)),
        ]);
        store
            .conditional_put("a", initial, &Condition::NotExists("key".into()))
            .await
            .unwrap();

        // A later write that does not mention set_at must not erase it.
        let renewal = record(&[("key", AttrValue::from("a")), ("heartbeats", AttrValue::N(1))]);
        store
            .conditional_put("a", renewal, &exists("a"))
            .await
            .unwrap();

        let stored = store.get("a").await.unwrap().unwrap();
        assert_eq!(
            stored.get("set_at"),
            Some(&AttrValue::from("2026-01-01T00:00:00Z"))
        );
        assert_eq!(stored.get("heartbeats"), Some(&AttrValue::N(1)));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_guard() {
        let store = MemoryStore::new();
        let rec = record(&[("key", AttrValue::from("a")), ("owner", AttrValue::from("x"))]);
        store
            .conditional_put("a", rec, &Condition::NotExists("key".into()))
            .await
            .unwrap();

        // Wrong guard: record stays.
        let err = store
            .conditional_delete("a", &Condition::Eq("owner".into(), "y".into()))
            .await
            .unwrap_err();
        assert!(err.is_condition_failure());
        assert_eq!(store.len(), 1);

        // Right guard: record goes.
        store
            .conditional_delete("a", &Condition::Eq("owner".into(), "x".into()))
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_record() {
        let store = MemoryStore::new();

        // Attribute guards cannot hold against an absent record.
        let err = store
            .conditional_delete("a", &exists("a"))
            .await
            .unwrap_err();
        assert!(err.is_condition_failure());

        // NotExists does hold; the delete is a successful no-op.
        store
            .conditional_delete("a", &Condition::NotExists("key".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_consistent_count_filters() {
        let store = MemoryStore::new();
        for (key, expiry) in [("a", 100), ("b", 200), ("c", 300)] {
            let rec = record(&[("key", AttrValue::from(key)), ("expiry", AttrValue::N(expiry))]);
            store
                .conditional_put(key, rec, &Condition::NotExists("key".into()))
                .await
                .unwrap();
        }

        let live = Condition::Gt("expiry".into(), AttrValue::N(150));
        assert_eq!(store.consistent_count(&live, &["expiry"]).await.unwrap(), 2);

        let one = Condition::And(vec![exists("b"), Condition::Gt("expiry".into(), AttrValue::N(150))]);
        assert_eq!(store.consistent_count(&one, &["key", "expiry"]).await.unwrap(), 1);

        let none = Condition::Gt("expiry".into(), AttrValue::N(999));
        assert_eq!(store.consistent_count(&none, &["expiry"]).await.unwrap(), 0);
    }
}
