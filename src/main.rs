//! backend-scheduler - composition root
//!
//! Loads configuration, opens the configured store, rebuilds scheduler
//! state from it and keeps it alive until a shutdown signal arrives.

use backend_scheduler::config::{load_config, STORAGE_MEMORY};
use backend_scheduler::infrastructure::shutdown_signal;
use backend_scheduler::{MemoryStore, SchedulerService, SchedulerStore, SqliteStore};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!("starting backend-scheduler storage={}", cfg.storage);

    // ===== COMPOSITION ROOT =====

    let store: Arc<dyn SchedulerStore> = if cfg.storage == STORAGE_MEMORY {
        tracing::warn!("using in-memory store, state is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let sqlite = SqliteStore::open(&cfg.db_path)?;
        tracing::info!("using sqlite store at {}", sqlite.path());
        Arc::new(sqlite)
    };

    let scheduler = SchedulerService::new(store, cfg.default_limit, cfg.rng_seed)?;

    tracing::info!(
        "scheduler ready, backends={} policies={} default_limit={}",
        scheduler.registry().len(),
        scheduler.policies().len(),
        scheduler.policies().default_limit()
    );

    shutdown_signal().await;

    scheduler.shutdown()?;
    tracing::info!("scheduler store flushed, exiting");
    Ok(())
}
