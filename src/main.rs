//! Traffic Router Server
//!
//! REST API for target management and visit routing decisions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use traffic_router::{
    api,
    config::{AppConfig, LoggingConfig, StorageBackend},
    repository::{
        memory::{MemoryQuotaStore, MemoryTargetRepository},
        Repository,
    },
    services::{redis::RedisService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing; the guard flushes the log file on exit
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting Traffic Router v{}", env!("CARGO_PKG_VERSION"));

    let (repository, redis_service) = match config.storage.backend {
        StorageBackend::Redis => {
            let redis_service = RedisService::new(&config.redis.url)
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!("Connected to Redis");
            (Repository::redis(redis_service.clone()), Some(redis_service))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, quotas are not shared between instances");
            let quotas = Arc::new(MemoryQuotaStore::new());
            spawn_counter_purge(quotas.clone());
            let repository = Repository {
                targets: Arc::new(MemoryTargetRepository::new()),
                quotas,
            };
            (repository, None)
        }
    };

    tracing::info!(
        "Quota enforcement: {:?}, counter TTL {}s",
        config.quota.enforcement,
        config.quota.ttl_seconds
    );

    let services = Services::new(repository, &config.quota, redis_service);

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .context("Invalid host address")?,
        config.server.port,
    );

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("traffic_router={},tower_http=debug", config.level).into());

    let stdout_layer = if config.format.eq_ignore_ascii_case("json") {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "traffic-router.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Periodically drop expired in-memory counters
fn spawn_counter_purge(store: Arc<MemoryQuotaStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {} expired quota counters", purged);
            }
        }
    });
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
