use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{StoreError, StoreResult};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Durable object storage.
///
/// JSON documents are stored as compact `serde_json` bytes, so writing the same
/// value twice produces byte-identical objects in every implementation.
#[async_trait]
pub trait BlobStore: Send + Sync + Debug {
    async fn get_bytes(&self, reference: &str) -> StoreResult<Vec<u8>>;

    /// Full overwrite; last write wins
    async fn put_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StoreResult<()>;

    /// Keys under `prefix`, sorted
    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Returns [`StoreError::NotFound`] when no object exists at `key`
    async fn get_json(&self, key: &str) -> StoreResult<serde_json::Value> {
        let bytes = self.get_bytes(key).await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::serialization(key, e))
    }

    async fn put_json(&self, key: &str, value: &serde_json::Value) -> StoreResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::serialization(key, e))?;
        self.put_bytes(bytes, key, JSON_CONTENT_TYPE).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Process-local blob store, used in tests and local runs
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: DashMap<String, StoredObject>,
    puts: AtomicU64,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a write
    pub fn insert(&self, key: &str, data: Vec<u8>, content_type: &str) {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of `put_bytes` calls served
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get_bytes(&self, reference: &str) -> StoreResult<Vec<u8>> {
        self.objects
            .get(reference)
            .map(|entry| entry.data.clone())
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))
    }

    async fn put_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StoreResult<()> {
        if key.trim().is_empty() {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
                reason: "key must not be empty".to_string(),
            });
        }
        self.insert(key, data, content_type);
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let store = InMemoryBlobStore::new();
        let err = store.get_json("nope.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_json_round_trip_is_byte_stable() {
        let store = InMemoryBlobStore::new();
        let value = json!({"jobId": "j", "segments": [], "totalMetric": 0.0});

        store.put_json("a.json", &value).await.unwrap();
        let first = store.object("a.json").unwrap();
        store.put_json("a.json", &value).await.unwrap();
        let second = store.object("a.json").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.content_type, JSON_CONTENT_TYPE);
        assert_eq!(store.get_json("a.json").await.unwrap(), value);
        assert_eq!(store.put_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_is_serialization_error() {
        let store = InMemoryBlobStore::new();
        store.insert("broken.json", b"{not json".to_vec(), JSON_CONTENT_TYPE);
        let err = store.get_json("broken.json").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }

    #[tokio::test]
    async fn test_list_keys_filters_by_prefix() {
        let store = InMemoryBlobStore::new();
        store.insert("jobs/b/job.json", vec![], JSON_CONTENT_TYPE);
        store.insert("jobs/a/job.json", vec![], JSON_CONTENT_TYPE);
        store.insert("sources/a.json", vec![], JSON_CONTENT_TYPE);

        assert_eq!(
            store.list_keys("jobs/").await.unwrap(),
            vec!["jobs/a/job.json".to_string(), "jobs/b/job.json".to_string()]
        );
    }
}
