//! Courier message-dispatch service.
//!
//! Main entry point. Initializes logging, configuration, the database pool,
//! the dispatch worker pool, and the HTTP server, then coordinates graceful
//! shutdown: the server drains first, then the workers.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use courier_api::{AppState, Config};
use courier_core::{storage::Storage, RealClock};
use courier_dispatch::{InMemoryCache, WebhookClient, WorkerPool};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config);

    info!(
        database_url = %config.database_url_masked(),
        num_workers = config.num_workers,
        webhook_base_url = %config.webhook_base_url,
        "starting courier message-dispatch service"
    );

    let db_pool = create_database_pool(&config).await?;
    info!("database connection pool established");

    run_migrations(&db_pool).await?;
    info!("database migrations completed");

    let storage = Arc::new(Storage::new(db_pool.clone()));
    let clock = Arc::new(RealClock::new());

    let client = Arc::new(
        WebhookClient::new(config.to_client_config())
            .context("failed to build webhook client")?,
    );
    let cache = Arc::new(InMemoryCache::new(config.to_cache_config(), clock.clone()));

    let dispatch_config = config.to_dispatch_config();
    let shutdown_timeout = dispatch_config.shutdown_timeout;

    let pool = Arc::new(WorkerPool::new(storage.clone(), client, cache, clock, dispatch_config));
    pool.start();

    let addr = config.parse_server_addr()?;
    let state = AppState::new(storage, pool.clone());

    info!(addr = %addr, "courier is ready");

    // Serves until SIGINT/SIGTERM, draining in-flight requests before
    // returning.
    courier_api::start_server(state, &config, addr).await.context("HTTP server failed")?;

    info!("shutting down worker pool");
    if let Err(err) = pool.shutdown(shutdown_timeout).await {
        error!(error = %err, "worker pool shutdown failed");
    } else {
        info!("worker pool shutdown complete");
    }

    db_pool.close().await;
    info!("database connections closed");

    info!("courier shutdown complete");
    Ok(())
}

/// Initializes tracing from the configured filter, honoring `RUST_LOG` when
/// set.
fn init_tracing(config: &Config) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.rust_log))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Creates the database connection pool with retry.
async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    let mut retries = 0;

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => {
                sqlx::query("SELECT 1")
                    .fetch_one(&pool)
                    .await
                    .context("failed to verify database connection")?;

                return Ok(pool);
            },
            Err(_e) if retries < MAX_RETRIES => {
                retries += 1;
                info!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    "database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("failed to create database connection pool after retries");
            },
        }
    }
}

/// Ensures the messages table and its indexes exist.
async fn run_migrations(pool: &sqlx::PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            content TEXT NOT NULL,
            recipient TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'unsent',
            failure_reason TEXT,
            webhook_message_id TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            sent_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create messages table")?;

    // Partial index backing the claim query's oldest-unsent scan.
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_messages_unsent
        ON messages(created_at)
        WHERE status = 'unsent'
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create unsent index")?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_messages_sent
        ON messages(sent_at DESC)
        WHERE status = 'sent'
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create sent index")?;

    Ok(())
}
