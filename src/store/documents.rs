//! JSON documents grouped into named indexes

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, index: &str, id: &str) -> Result<Option<JsonValue>>;

    /// Create or replace a document
    async fn index(&self, index: &str, id: &str, document: JsonValue) -> Result<()>;

    /// Merge `partial` into an existing document; `false` if it does not exist
    async fn update(&self, index: &str, id: &str, partial: JsonValue) -> Result<bool>;

    /// Create or replace several documents, returning how many were written
    async fn bulk_index(&self, index: &str, documents: Vec<(String, JsonValue)>) -> Result<usize>;

    /// Make earlier writes visible to reads, returning the index's document count
    async fn refresh(&self, index: &str) -> Result<usize>;
}

/// Recursively merge `patch` into `target`
///
/// Objects merge key by key; any other patch value replaces the target.
pub fn merge_json(target: &mut JsonValue, patch: JsonValue) {
    match (target, patch) {
        (JsonValue::Object(target), JsonValue::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Document store kept in process memory; writes are visible immediately
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    indexes: RwLock<HashMap<String, HashMap<String, JsonValue>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, index: &str, id: &str) -> Result<Option<JsonValue>> {
        let indexes = self.indexes.read().await;
        Ok(indexes.get(index).and_then(|docs| docs.get(id)).cloned())
    }

    async fn index(&self, index: &str, id: &str, document: JsonValue) -> Result<()> {
        self.indexes
            .write()
            .await
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn update(&self, index: &str, id: &str, partial: JsonValue) -> Result<bool> {
        let mut indexes = self.indexes.write().await;
        match indexes.get_mut(index).and_then(|docs| docs.get_mut(id)) {
            Some(existing) => {
                merge_json(existing, partial);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn bulk_index(&self, index: &str, documents: Vec<(String, JsonValue)>) -> Result<usize> {
        let mut indexes = self.indexes.write().await;
        let docs = indexes.entry(index.to_string()).or_default();
        let count = documents.len();
        docs.extend(documents);
        Ok(count)
    }

    async fn refresh(&self, index: &str) -> Result<usize> {
        let indexes = self.indexes.read().await;
        Ok(indexes.get(index).map_or(0, HashMap::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_json_nested() {
        let mut doc = json!({"a": {"b": 1, "c": 2}, "d": [1]});

        merge_json(&mut doc, json!({"a": {"b": 10}, "d": [2], "e": null}));

        assert_eq!(doc, json!({"a": {"b": 10, "c": 2}, "d": [2], "e": null}));
    }

    #[tokio::test]
    async fn test_memory_store_lifecycle() {
        let store = MemoryDocumentStore::new();

        store.index("users", "1", json!({"name": "ada"})).await.unwrap();
        assert!(store.update("users", "1", json!({"age": 36})).await.unwrap());
        assert!(!store.update("users", "2", json!({})).await.unwrap());

        assert_eq!(
            store.get("users", "1").await.unwrap(),
            Some(json!({"name": "ada", "age": 36}))
        );
        assert_eq!(store.get("users", "2").await.unwrap(), None);
        assert_eq!(store.get("missing", "1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bulk_index_and_refresh() {
        let store = MemoryDocumentStore::new();

        let written = store
            .bulk_index(
                "logs",
                vec![("a".to_string(), json!({})), ("b".to_string(), json!({}))],
            )
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(store.refresh("logs").await.unwrap(), 2);
        assert_eq!(store.refresh("other").await.unwrap(), 0);
    }
}
