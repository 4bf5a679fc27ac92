use super::{KeyValueStore, PutOptions};
use crate::error::StoreError;
use crate::utils::now_epoch;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Pool, Postgres};
use std::time::Duration;

/// Key-value table on Postgres. Expired rows stay invisible to reads until
/// the purge job removes them.
#[derive(Clone)]
pub struct PgStore {
    db_connection_pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(db_connection_pool: Pool<Postgres>) -> Self {
        Self { db_connection_pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
              create table if not exists kv_entries (
                  key text primary key,
                  value text not null,
                  metadata jsonb,
                  expiration bigint
              )
            "#,
        )
        .execute(&self.db_connection_pool)
        .await?;
        sqlx::query("create index if not exists kv_entries_expiration on kv_entries (expiration)")
            .execute(&self.db_connection_pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for PgStore {
    async fn get(&self, key: &str, _cache_ttl: Option<Duration>) -> Result<Option<String>, StoreError> {
        let value: Option<String> = sqlx::query_scalar(
            "select value from kv_entries where key = $1 and (expiration is null or expiration > $2)",
        )
        .bind(key)
        .bind(now_epoch())
        .fetch_optional(&self.db_connection_pool)
        .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        sqlx::query(
            r#"
              insert into kv_entries(key, value, metadata, expiration) values ($1, $2, $3, $4)
              on conflict (key) do update
                  set value = excluded.value, metadata = excluded.metadata, expiration = excluded.expiration
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(options.metadata.map(Json::<Value>))
        .bind(options.expiration)
        .execute(&self.db_connection_pool)
        .await?;
        Ok(())
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("delete from kv_entries where expiration <= $1")
            .bind(now)
            .execute(&self.db_connection_pool)
            .await?;
        Ok(result.rows_affected())
    }
}
