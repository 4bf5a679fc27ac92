use dotenvy::dotenv;
use link_redirector::access_log::{AccessLog, PgAccessLog, TracingAccessLog};
use link_redirector::config::Settings;
use link_redirector::routes::{create_router, AppState};
use link_redirector::store::{CachedStore, KeyValueStore, MemoryStore, PgStore};
use link_redirector::utils::now_epoch;
use axum::serve;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_TRACING_LEVEL: &str = "link_redirector=debug,access_log=info";
const DATABASE_MAX_CONNECTIONS: u32 = 20;
const PURGE_JOB_CRON_EXPRESSION: &str = "1/60 * * * * *";

#[tokio::main]
async fn main() {
    _ = dotenv();
    configure_tracing();
    let settings = Settings::from_env().expect("Invalid configuration");
    let (store, access_log) = create_backends(&settings).await;
    configure_scheduler(store.clone()).await;
    let listener = create_listener(&settings.server_address).await;
    let router = create_router(AppState::new(settings, store, access_log));
    serve(listener, router)
        .await
        .expect("Server failed to start");
}

fn configure_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or(DEFAULT_TRACING_LEVEL.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn create_backends(settings: &Settings) -> (Arc<dyn KeyValueStore>, Arc<dyn AccessLog>) {
    let (backing, access_log): (Arc<dyn KeyValueStore>, Arc<dyn AccessLog>) =
        match &settings.database_url {
            Some(database_url) => {
                let db_connection_pool = create_db_connection_pool(database_url).await;
                let store = PgStore::new(db_connection_pool.clone());
                store
                    .ensure_schema()
                    .await
                    .expect("Creating link store schema failed");
                let access_log = PgAccessLog::new(db_connection_pool);
                access_log
                    .ensure_schema()
                    .await
                    .expect("Creating access log schema failed");
                tracing::info!("Using postgres link store");
                (Arc::new(store), Arc::new(access_log))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, links are kept in memory only");
                (Arc::new(MemoryStore::new()), Arc::new(TracingAccessLog))
            }
        };
    (Arc::new(CachedStore::new(backing)), access_log)
}

async fn create_db_connection_pool(database_url: &str) -> Pool<Postgres> {
    PgPoolOptions::new()
        .max_connections(DATABASE_MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .expect("Creating database connection pool failed")
}

async fn configure_scheduler(store: Arc<dyn KeyValueStore>) {
    let scheduler = JobScheduler::new()
        .await
        .expect("Creating scheduler failed");
    scheduler
        .add(create_purge_job(PURGE_JOB_CRON_EXPRESSION, store))
        .await
        .expect("Adding purge job to scheduler failed");
    scheduler.start().await.expect("Starting scheduler failed");
}

fn create_purge_job(cron_expression: &str, store: Arc<dyn KeyValueStore>) -> Job {
    Job::new_async(cron_expression, move |_, _| {
        let store = store.clone();
        Box::pin(async move {
            match store.purge_expired(now_epoch()).await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!("Purged {} expired entries", purged),
                Err(err) => tracing::error!("Purging expired entries failed: {}", err),
            }
        })
    })
    .expect("Creating purge job failed")
}

async fn create_listener(server_address: &str) -> TcpListener {
    let listener = TcpListener::bind(&server_address)
        .await
        .expect("Creating tcp listener failed");
    tracing::info!("Listening on address: {}", server_address);
    listener
}
