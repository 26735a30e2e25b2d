//! Reminder Scheduler - bounded in-memory scheduling of stored reminders
//!
//! Serves the reminder HTTP API and delivers reminders as they come due.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reminder_scheduler::api::create_router;
use reminder_scheduler::notifier::LogNotifier;
use reminder_scheduler::store::MemoryStore;
use reminder_scheduler::{AppState, CacheManager, Config, ReminderScheduler};

/// Main entry point for the reminder scheduler server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache manager, store, notifier and scheduler
/// 4. Run the scheduler: initial fill, refill and health tasks
/// 5. Start HTTP server on configured port
/// 6. Stop the scheduler on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reminder_scheduler=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reminder scheduler");

    let config = Config::from_env();
    info!(
        "Configuration loaded: fetch_limit={}, cache_limit={}, fetch_interval={}s, health_check_interval={}s, eviction_min_ttl={}s, port={}",
        config.fetch_limit,
        config.cache_limit,
        config.fetch_interval,
        config.health_check_interval,
        config.eviction_min_ttl,
        config.server_port
    );

    let cache = CacheManager::new();
    let scheduler = ReminderScheduler::new(
        &cache,
        Arc::new(MemoryStore::new()),
        Arc::new(LogNotifier::default()),
        config.scheduler(),
    )
    .context("Failed to create reminder scheduler")?;

    scheduler.run().await;

    let app = create_router(AppState::from_config(scheduler.clone(), &config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the scheduler.
async fn shutdown_signal(scheduler: Arc<ReminderScheduler>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    scheduler.shutdown();
    warn!("Scheduler tasks aborted");
}
