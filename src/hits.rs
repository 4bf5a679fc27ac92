use crate::access_log::{AccessEntry, AccessLog, Visit};
use crate::codec::{encode, metadata};
use crate::error::{PersistError, StoreError};
use crate::model::LinkRecord;
use crate::store::{KeyValueStore, PutOptions};
use crate::utils::with_timeout;
use std::sync::Arc;
use tokio::task::JoinHandle;

const ACCESS_LOG_TIMEOUT: u64 = 300;

/// This view applied to a record: one more hit, first view stamped once.
pub fn apply_hit(record: &LinkRecord, now: i64) -> LinkRecord {
    LinkRecord {
        hit_count: record.hit_count.saturating_add(1),
        first_hit_at: record.first_hit_at.or(Some(now)),
        ..record.clone()
    }
}

/// Counts views. Writes are last-writer-wins with no compare-and-swap, so
/// concurrent views of one slug can lose increments.
pub struct HitAccountant {
    store: Arc<dyn KeyValueStore>,
    access_log: Arc<dyn AccessLog>,
}

impl HitAccountant {
    pub fn new(store: Arc<dyn KeyValueStore>, access_log: Arc<dyn AccessLog>) -> Self {
        Self { store, access_log }
    }

    /// Starts persisting `updated` under `key` and writes the access log.
    /// The returned handle may be dropped; failures are only logged.
    pub async fn record(&self, key: &str, updated: &LinkRecord, visit: &Visit) -> JoinHandle<()> {
        let persist = self.persist(key.to_string(), updated.clone());

        let entry = AccessEntry::new(updated, visit);
        match with_timeout(ACCESS_LOG_TIMEOUT, self.access_log.write(&entry)).await {
            Err(elapsed) => tracing::error!("Failed write access log: {}", elapsed),
            Ok(Err(err)) => tracing::error!("Failed write access log: {}", err),
            _ => tracing::debug!("Access log written for {}", updated.slug),
        }

        persist
    }

    fn persist(&self, key: String, updated: LinkRecord) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(err) = write_record(store.as_ref(), &key, &updated, updated.expiration).await {
                tracing::error!("Failed to update hit count for {}: {}", key, err);
            }
        })
    }
}

/// Writes a record with its expiration and introspection metadata.
pub async fn write_record(
    store: &dyn KeyValueStore,
    key: &str,
    record: &LinkRecord,
    expiration: Option<i64>,
) -> Result<(), PersistError> {
    let value = encode(record)?;
    let metadata = serde_json::to_value(metadata(record, expiration)).map_err(StoreError::from)?;
    store
        .put(
            key,
            value,
            PutOptions {
                expiration,
                metadata: Some(metadata),
            },
        )
        .await?;
    Ok(())
}
