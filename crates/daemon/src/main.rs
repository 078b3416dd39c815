//! GrabGrub Sweeper - removes expired posts and deals in the background

mod config;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{DaemonConfig, LogFormat};
use grabgrub_core::application::constants::SHUTDOWN_GRACE_PERIOD;
use grabgrub_core::application::{shutdown_channel, ExpirySweeper, ListingService};
use grabgrub_core::domain::{Deal, Post};
use grabgrub_core::port::time_provider::SystemTimeProvider;
use grabgrub_core::port::{KeyValueStore, TimeProvider};
use grabgrub_infra_sqlite::{open_database, SqliteKeyValueStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("grabgrub=info"))
        .context("Failed to create env filter")?;

    match format {
        // Production: JSON structured logging
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .try_init()?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration (needed before logging to pick the format)
    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    init_logging(config.log_format)?;

    info!("GrabGrub sweeper v{} starting...", VERSION);

    // 2. Storage
    info!(db_path = %config.db_path.display(), "Opening storage...");
    let pool = open_database(&config.db_path)
        .await
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    // 3. Wiring
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let store: Arc<dyn KeyValueStore> =
        Arc::new(SqliteKeyValueStore::new(pool.clone(), time_provider.clone()));
    let clock = config.clock();

    let posts = Arc::new(ListingService::<Post>::new(
        store.clone(),
        time_provider.clone(),
        clock,
    ));
    let deals = Arc::new(ListingService::<Deal>::new(store, time_provider, clock));
    let sweeper = ExpirySweeper::new(posts, deals, config.sweep_interval);

    // 4. Catch up on anything that expired while we were down
    match sweeper.sweep_once().await {
        Ok(stats) => info!(removed = stats.total(), "Startup sweep completed"),
        Err(e) => error!(error = ?e, "Startup sweep failed"),
    }

    // 5. Periodic sweep
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_rx));

    info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");
    shutdown_tx.shutdown();
    if tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, sweeper_handle)
        .await
        .is_err()
    {
        warn!("Sweeper did not stop within the grace period");
    }

    pool.close().await;
    info!("Shutdown complete.");
    Ok(())
}
