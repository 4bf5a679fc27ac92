mod cached;
mod memory;
mod postgres;

pub use cached::CachedStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Write options carried alongside a value.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Epoch seconds after which the entry is no longer readable.
    pub expiration: Option<i64>,
    pub metadata: Option<Value>,
}

/// Minimal key-value contract the redirect pipeline runs on.
///
/// `cache_ttl` bounds how stale a read may be; `None` asks for a read that
/// goes straight to the backing store.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str, cache_ttl: Option<Duration>) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError>;

    /// Drops entries whose expiration is at or before `now`.
    async fn purge_expired(&self, now: i64) -> Result<u64, StoreError>;
}

pub(crate) fn is_live(expiration: Option<i64>, now: i64) -> bool {
    expiration.map_or(true, |expiration| expiration > now)
}
