//! Service configuration read from the environment.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use orderflow_ingest::worker::WorkerOptions;
use orderflow_store::pg_channel::SubscriptionOptions;

use crate::error::AppError;

/// Runtime configuration of the service.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` connection string (`DATABASE_URL`, required).
    pub database_url: String,
    /// Bind address (`HOST`, default `0.0.0.0`).
    pub host: String,
    /// Bind port (`PORT`, default `3000`).
    pub port: u16,
    /// Pool size (`DB_MAX_CONNECTIONS`, default `10`).
    pub db_max_connections: u32,
    /// Channel subject carrying orders (`ORDER_SUBJECT`, default `orders`).
    pub order_subject: String,
    /// Concurrent deliveries (`INGEST_MAX_IN_FLIGHT`, default `8`).
    pub ingest_max_in_flight: usize,
    /// Redelivery interval for unacknowledged messages (`ACK_WAIT_SECS`, default `30`).
    pub ack_wait: Duration,
    /// Idle poll interval (`CHANNEL_POLL_MILLIS`, default `250`).
    pub channel_poll_interval: Duration,
    /// Messages leased per poll (`CHANNEL_BATCH_SIZE`, default `16`).
    pub channel_batch_size: u16,
    /// How long acknowledged channel messages are kept (`CHANNEL_RETENTION_HOURS`, default `168`).
    pub channel_retention: Duration,
    /// OTLP collector endpoint (`OTEL_EXPORTER_OTLP_ENDPOINT`, optional).
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::Config("DATABASE_URL environment variable must be set".into()))?;
        let ingest_max_in_flight: usize = parse(&lookup, "INGEST_MAX_IN_FLIGHT", 8)?;
        if ingest_max_in_flight == 0 {
            return Err(AppError::Config("INGEST_MAX_IN_FLIGHT must be at least 1".into()));
        }

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse(&lookup, "PORT", 3000)?,
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            order_subject: lookup("ORDER_SUBJECT").unwrap_or_else(|| "orders".to_owned()),
            ingest_max_in_flight,
            ack_wait: Duration::from_secs(parse(&lookup, "ACK_WAIT_SECS", 30)?),
            channel_poll_interval: Duration::from_millis(parse(&lookup, "CHANNEL_POLL_MILLIS", 250)?),
            channel_batch_size: parse(&lookup, "CHANNEL_BATCH_SIZE", 16)?,
            channel_retention: Duration::from_secs(
                parse::<u64>(&lookup, "CHANNEL_RETENTION_HOURS", 168)?.saturating_mul(3600),
            ),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|e| !e.is_empty()),
        })
    }

    /// The address the HTTP server binds to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Subscription tuning for the order channel.
    #[must_use]
    pub fn subscription_options(&self) -> SubscriptionOptions {
        SubscriptionOptions {
            ack_wait: self.ack_wait,
            batch_size: self.channel_batch_size,
            poll_interval: self.channel_poll_interval,
        }
    }

    /// Ingest worker tuning.
    #[must_use]
    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            max_in_flight: self.ingest_max_in_flight,
            ..WorkerOptions::default()
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid value: {e}"))),
        None => Ok(default),
    }
}
