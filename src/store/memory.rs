use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{ConsumeOutcome, DocRef, DocumentStore, StoreError};

type Collection = BTreeMap<String, Value>;

/// In-process store. Every operation runs under one lock, so the
/// conditional and compound operations are atomic.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn counter(doc: &Value, field: &str) -> i64 {
    doc.get(field).and_then(Value::as_i64).unwrap_or(0)
}

fn increment_in(
    collections: &mut HashMap<String, Collection>,
    collection: &str,
    key: &str,
    field: &str,
    delta: i64,
) -> Option<i64> {
    let doc = collections.get_mut(collection)?.get_mut(key)?;
    let next = counter(doc, field) + delta;
    if let Value::Object(map) = doc {
        map.insert(field.to_string(), Value::from(next));
    }
    Some(next)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_by_key(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let guard = self.collections.lock().await;
        Ok(guard.get(collection).and_then(|c| c.get(key)).cloned())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        equals: &Value,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let guard = self.collections.lock().await;
        let Some(docs) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, doc)| doc.get(field) == Some(equals))
            .take(limit)
            .map(|(k, doc)| (k.clone(), doc.clone()))
            .collect())
    }

    async fn set_by_key(&self, collection: &str, key: &str, fields: Value) -> Result<(), StoreError> {
        let mut guard = self.collections.lock().await;
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), fields);
        Ok(())
    }

    async fn delete_by_key(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let mut guard = self.collections.lock().await;
        Ok(guard
            .get_mut(collection)
            .and_then(|c| c.remove(key))
            .is_some())
    }

    async fn atomic_increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut guard = self.collections.lock().await;
        increment_in(&mut guard, collection, key, field, delta).ok_or_else(|| StoreError::Missing {
            collection: collection.to_string(),
            key: key.to_string(),
        })
    }

    async fn create_if_absent(
        &self,
        collection: &str,
        key: &str,
        fields: Value,
    ) -> Result<bool, StoreError> {
        let mut guard = self.collections.lock().await;
        let docs = guard.entry(collection.to_string()).or_default();
        if docs.contains_key(key) {
            return Ok(false);
        }
        docs.insert(key.to_string(), fields);
        Ok(true)
    }

    async fn consume_and_increment(
        &self,
        consume: DocRef<'_>,
        target: DocRef<'_>,
        field: &str,
        delta: i64,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut guard = self.collections.lock().await;
        let removed = guard
            .get_mut(consume.collection)
            .and_then(|c| c.remove(consume.key))
            .is_some();
        if !removed {
            return Ok(ConsumeOutcome::NothingToConsume);
        }
        let new_value = increment_in(&mut guard, target.collection, target.key, field, delta);
        Ok(ConsumeOutcome::Consumed { new_value })
    }

    async fn top_by_field(
        &self,
        collection: &str,
        field: &str,
        limit: usize,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let guard = self.collections.lock().await;
        let Some(docs) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<(String, Value)> =
            docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        // BTreeMap iteration is key ordered and sort_by is stable.
        rows.sort_by(|a, b| counter(&b.1, field).cmp(&counter(&a.1, field)));
        rows.truncate(limit);
        Ok(rows)
    }
}
