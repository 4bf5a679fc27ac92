use crate::error::AccessLogError;
use crate::model::LinkRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

/// One successful view of a link.
#[derive(Debug, Clone)]
pub struct AccessEntry {
    pub slug: String,
    pub url: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

impl AccessEntry {
    pub fn new(record: &LinkRecord, visit: &Visit) -> Self {
        AccessEntry {
            slug: record.slug.clone(),
            url: record.url.clone(),
            referer: visit.referer.clone(),
            user_agent: visit.user_agent.clone(),
            ip: visit.ip.clone(),
            viewed_at: Utc::now(),
        }
    }
}

/// Request details worth logging.
#[derive(Debug, Clone, Default)]
pub struct Visit {
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

#[async_trait]
pub trait AccessLog: Send + Sync + 'static {
    async fn write(&self, entry: &AccessEntry) -> Result<(), AccessLogError>;
}

/// Emits each view as a structured tracing event.
#[derive(Debug, Default)]
pub struct TracingAccessLog;

#[async_trait]
impl AccessLog for TracingAccessLog {
    async fn write(&self, entry: &AccessEntry) -> Result<(), AccessLogError> {
        tracing::info!(
            target: "access_log",
            slug = %entry.slug,
            url = entry.url.as_deref().unwrap_or_default(),
            referer = entry.referer.as_deref().unwrap_or_default(),
            user_agent = entry.user_agent.as_deref().unwrap_or_default(),
            ip = entry.ip.as_deref().unwrap_or_default(),
            "link viewed"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgAccessLog {
    db_connection_pool: Pool<Postgres>,
}

impl PgAccessLog {
    pub fn new(db_connection_pool: Pool<Postgres>) -> Self {
        Self { db_connection_pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), AccessLogError> {
        sqlx::query(
            r#"
              create table if not exists access_logs (
                  id bigserial primary key,
                  slug text not null,
                  url text,
                  referer text,
                  user_agent text,
                  ip text,
                  created_at timestamptz not null
              )
            "#,
        )
        .execute(&self.db_connection_pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AccessLog for PgAccessLog {
    async fn write(&self, entry: &AccessEntry) -> Result<(), AccessLogError> {
        sqlx::query(
            r#"
              insert into access_logs(slug, url, referer, user_agent, ip, created_at) values ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&entry.slug)
        .bind(&entry.url)
        .bind(&entry.referer)
        .bind(&entry.user_agent)
        .bind(&entry.ip)
        .bind(entry.viewed_at)
        .execute(&self.db_connection_pool)
        .await?;
        Ok(())
    }
}
