use super::{KeyValueStore, PutOptions};
use crate::error::StoreError;
use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Clone)]
struct CachedValue {
    value: String,
    ttl: Duration,
}

/// Each entry lives for the TTL of the read that populated it.
struct ReadTtlExpiry;

impl Expiry<String, CachedValue> for ReadTtlExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Read-through cache in front of another store. Only hits are cached;
/// writes invalidate the key.
pub struct CachedStore {
    inner: Arc<dyn KeyValueStore>,
    cache: Cache<String, CachedValue>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self::with_capacity(inner, DEFAULT_MAX_CAPACITY)
    }

    pub fn with_capacity(inner: Arc<dyn KeyValueStore>, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(ReadTtlExpiry)
            .build();
        Self { inner, cache }
    }
}

#[async_trait]
impl KeyValueStore for CachedStore {
    async fn get(&self, key: &str, cache_ttl: Option<Duration>) -> Result<Option<String>, StoreError> {
        let Some(ttl) = cache_ttl.filter(|ttl| !ttl.is_zero()) else {
            return self.inner.get(key, None).await;
        };
        if let Some(cached) = self.cache.get(key).await {
            tracing::trace!("Cache hit for key: {}", key);
            return Ok(Some(cached.value));
        }
        let value = self.inner.get(key, None).await?;
        if let Some(value) = &value {
            self.cache
                .insert(
                    key.to_string(),
                    CachedValue {
                        value: value.clone(),
                        ttl,
                    },
                )
                .await;
        }
        Ok(value)
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        self.inner.put(key, value, options).await?;
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, StoreError> {
        let purged = self.inner.purge_expired(now).await?;
        if purged > 0 {
            self.cache.invalidate_all();
        }
        Ok(purged)
    }
}
