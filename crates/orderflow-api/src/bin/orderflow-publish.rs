//! Publishes order documents onto the order channel.
//!
//! Usage: `orderflow-publish <file.json>...`
//!
//! Reads `DATABASE_URL` and `ORDER_SUBJECT` the same way the service does.
//! Payloads are sent as-is, so malformed documents can be published too.

use std::error::Error;

use orderflow_api::config::Config;
use orderflow_store::pg_channel::PgChannel;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err.into());
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        return Err("usage: orderflow-publish <file.json>...".into());
    }

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;
    orderflow_store::MIGRATOR.run(&pool).await?;
    let channel = PgChannel::new(pool.clone());

    for path in &paths {
        let payload = tokio::fs::read(path)
            .await
            .map_err(|e| format!("failed to read {path}: {e}"))?;
        let id = channel.publish(&config.order_subject, &payload).await?;
        tracing::info!(%path, message_id = id, subject = %config.order_subject, "Published");
    }

    pool.close().await;
    Ok(())
}
