//! Orderflow service entry point.
//!
//! Startup order: configuration, telemetry, database and migrations, cache
//! warm-load, then the ingest worker and the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use orderflow_api::app::build_router;
use orderflow_api::config::Config;
use orderflow_api::error::AppError;
use orderflow_api::state::AppState;
use orderflow_api::telemetry;
use orderflow_cache::OrderCache;
use orderflow_core::repository::OrderRepository;
use orderflow_ingest::ingestor::OrderIngestor;
use orderflow_ingest::worker::IngestWorker;
use orderflow_store::pg_channel::PgChannel;
use orderflow_store::pg_order_repository::PgOrderRepository;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // A missing .env file is fine; the process environment still applies.
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(AppError::Config(format!("failed to load .env: {err}")));
        }
    }

    let config = Config::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Orderflow service");

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    orderflow_store::MIGRATOR.run(&pool).await?;

    let repository: Arc<dyn OrderRepository> = Arc::new(PgOrderRepository::new(pool.clone()));

    // The cache must be warm before anything can read or write it.
    let cache = OrderCache::new();
    let report = cache.warm_load(repository.as_ref()).await?;
    tracing::info!(loaded = report.loaded, skipped = report.skipped, "Cache ready");

    // Start the ingest worker and the channel retention sweep.
    let channel = PgChannel::new(pool.clone());
    let subscription = channel.subscribe(&config.order_subject, config.subscription_options());
    let worker = IngestWorker::new(
        OrderIngestor::new(Arc::clone(&repository), cache.clone()),
        config.worker_options(),
    );
    let (stop, stopped) = watch::channel(false);
    let mut worker_stopped = stopped.clone();
    let worker_handle = tokio::spawn(async move {
        worker
            .run(subscription, async move {
                let _ = worker_stopped.changed().await;
            })
            .await
    });
    let sweep_handle = tokio::spawn(purge_acked_messages(channel, config.channel_retention, stopped));
    tracing::info!(subject = %config.order_subject, "Subscribed to order channel");

    // Build router.
    let app = build_router(AppState::new(cache))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server.
    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, draining ingest worker");
    let _ = stop.send(true);
    match worker_handle.await {
        Ok(stats) => tracing::info!(
            acked = stats.acked,
            deferred = stats.deferred,
            "Ingest worker stopped"
        ),
        Err(err) => tracing::error!(error = %err, "Ingest worker task failed"),
    }
    if let Err(err) = sweep_handle.await {
        tracing::error!(error = %err, "Channel retention task failed");
    }
    pool.close().await;

    Ok(())
}

/// Deletes acknowledged channel messages older than `retention`, once per
/// `SWEEP_INTERVAL`, until `stopped` changes.
async fn purge_acked_messages(channel: PgChannel, retention: Duration, mut stopped: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = stopped.changed() => break,
            _ = ticker.tick() => match channel.purge_acked(retention).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Purged acknowledged channel messages"),
                Err(err) => tracing::warn!(error = %err, "Failed to purge acknowledged channel messages"),
            },
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
