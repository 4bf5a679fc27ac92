//! Shared setup for router level tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use link_redirector::access_log::{AccessEntry, AccessLog};
use link_redirector::auth::hash_api_key;
use link_redirector::codec::{decode, link_key};
use link_redirector::config::Settings;
use link_redirector::error::{AccessLogError, StoreError};
use link_redirector::model::LinkRecord;
use link_redirector::routes::{create_router, AppState};
use link_redirector::store::{CachedStore, KeyValueStore, MemoryStore, PutOptions};

pub const API_KEY: &str = "test-admin-key";

/// Access log that only counts writes.
#[derive(Default)]
pub struct CountingLog {
    writes: AtomicUsize,
}

impl CountingLog {
    pub fn count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessLog for CountingLog {
    async fn write(&self, _entry: &AccessEntry) -> Result<(), AccessLogError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Memory store with switchable read and write outages.
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn outage() -> StoreError {
        StoreError::Database(sqlx::Error::PoolClosed)
    }
}

#[async_trait]
impl KeyValueStore for FaultyStore {
    async fn get(&self, key: &str, cache_ttl: Option<Duration>) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.get(key, cache_ttl).await
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.put(key, value, options).await
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, StoreError> {
        self.inner.purge_expired(now).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn KeyValueStore>,
    pub backing: Arc<MemoryStore>,
    pub faults: Arc<FaultyStore>,
    pub log: Arc<CountingLog>,
}

/// Read caching is off so consecutive requests observe background writes
/// deterministically.
pub fn test_settings() -> Settings {
    Settings {
        admin_key_hash: Some(hash_api_key(API_KEY)),
        link_cache_ttl: Duration::ZERO,
        ..Settings::default()
    }
}

pub fn app(settings: Settings) -> TestApp {
    let backing = Arc::new(MemoryStore::new());
    let faults = Arc::new(FaultyStore::new(backing.clone()));
    let store: Arc<dyn KeyValueStore> = Arc::new(CachedStore::new(faults.clone()));
    let log = Arc::new(CountingLog::default());
    let router = create_router(AppState::new(settings, store.clone(), log.clone()));
    TestApp {
        router,
        store,
        backing,
        faults,
        log,
    }
}

impl TestApp {
    pub async fn seed(&self, key: &str, record: Value) {
        self.backing
            .put(key, record.to_string(), PutOptions::default())
            .await
            .expect("Seeding failed");
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn record(&self, slug: &str) -> LinkRecord {
        let raw = self
            .backing
            .get(&link_key(slug), None)
            .await
            .unwrap()
            .expect("Record missing");
        decode(&raw).expect("Record undecodable").0
    }

    /// Waits for background hit persistence to land.
    pub async fn wait_for_hits(&self, slug: &str, hit_count: u64) -> LinkRecord {
        for _ in 0..100 {
            let record = self.record(slug).await;
            if record.hit_count == hit_count {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{slug} never reached {hit_count} hits");
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
