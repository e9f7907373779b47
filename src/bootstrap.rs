use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tracing::info;

use crate::{
    api::handler::AppState,
    config::Config,
    error::AppResult,
    ledger::PgLedgerStore,
    reconcile::{BatchProcessor, ReconciliationOrchestrator, WorkerPool},
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    // Database pool
    let pool = initialize_database(&config.database_url).await?;

    // Core components
    let store = Arc::new(PgLedgerStore::new(pool));
    let processor = Arc::new(BatchProcessor::new(store.clone()));

    let worker_pool = Arc::new(WorkerPool::new(
        config.worker_core_size,
        config.worker_max_size,
        config.worker_queue_capacity,
    ));
    info!(
        "✅ Worker pool initialized: {} core / {} max workers, queue capacity {}",
        config.worker_core_size, config.worker_max_size, config.worker_queue_capacity
    );

    let orchestrator = Arc::new(ReconciliationOrchestrator::new(
        store,
        processor,
        worker_pool,
        config.customer_batch_size,
    ));
    info!(
        "✅ Reconciliation orchestrator initialized (batch size {})",
        config.customer_batch_size
    );

    Ok(AppState { orchestrator })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(50)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    // Run migrations
    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
