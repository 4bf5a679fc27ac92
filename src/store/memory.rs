use super::{is_live, KeyValueStore, PutOptions};
use crate::error::StoreError;
use crate::utils::now_epoch;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    metadata: Option<Value>,
    expiration: Option<i64>,
}

/// Process local store, used when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn metadata(&self, key: &str) -> Option<Value> {
        self.entries
            .read()
            .await
            .get(key)
            .and_then(|entry| entry.metadata.clone())
    }

    pub async fn expiration(&self, key: &str) -> Option<i64> {
        self.entries
            .read()
            .await
            .get(key)
            .and_then(|entry| entry.expiration)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str, _cache_ttl: Option<Duration>) -> Result<Option<String>, StoreError> {
        let now = now_epoch();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|entry| is_live(entry.expiration, now))
            .map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        self.entries.write().await.insert(
            key.to_string(),
            MemoryEntry {
                value,
                metadata: options.metadata,
                expiration: options.expiration,
            },
        );
        Ok(())
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| is_live(entry.expiration, now));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_then_get_round_trips_value_and_metadata() {
        let store = MemoryStore::new();
        store
            .put(
                "link:a",
                "{}".into(),
                PutOptions {
                    expiration: None,
                    metadata: Some(json!({"url": "https://example.com"})),
                },
            )
            .await
            .unwrap();
        assert_eq!(store.get("link:a", None).await.unwrap().as_deref(), Some("{}"));
        assert_eq!(
            store.metadata("link:a").await,
            Some(json!({"url": "https://example.com"}))
        );
        assert!(store.get("link:b", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_invisible_and_purged() {
        let store = MemoryStore::new();
        let now = now_epoch();
        let expired = PutOptions {
            expiration: Some(now - 1),
            metadata: None,
        };
        let live = PutOptions {
            expiration: Some(now + 3600),
            metadata: None,
        };
        store.put("old", "1".into(), expired).await.unwrap();
        store.put("new", "2".into(), live).await.unwrap();

        assert!(store.get("old", None).await.unwrap().is_none());
        assert_eq!(store.get("new", None).await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
    }
}
