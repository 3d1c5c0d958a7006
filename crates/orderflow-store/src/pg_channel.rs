//! Durable order channel on `PostgreSQL`.
//!
//! Messages are rows in `channel_messages`. A subscription leases due rows
//! with `FOR UPDATE SKIP LOCKED`, pushing their `deliver_after` forward by the
//! ack wait; a leased message that is not acknowledged in time becomes due
//! again and is redelivered. Delivery is at-least-once.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};

use orderflow_core::error::TransportError;
use orderflow_core::transport::{Delivery, MessageSource};

use crate::error::transport_error;

/// Publisher and subscription factory for the order channel.
#[derive(Debug, Clone)]
pub struct PgChannel {
    pool: PgPool,
}

/// Tuning for a single subscription.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionOptions {
    /// How long a handed-out message stays invisible before redelivery.
    pub ack_wait: Duration,
    /// Maximum number of messages leased per round trip.
    pub batch_size: u16,
    /// Pause between polls when nothing is due.
    pub poll_interval: Duration,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            ack_wait: Duration::from_secs(30),
            batch_size: 16,
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl PgChannel {
    /// Creates a new `PgChannel`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends a message to `subject` and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Unavailable` if the insert fails.
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn publish(&self, subject: &str, payload: &[u8]) -> Result<i64, TransportError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO channel_messages (subject, payload) VALUES ($1, $2) RETURNING id",
        )
        .bind(subject)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| transport_error(&e))?;
        debug!(message_id = id, "message published");
        Ok(id)
    }

    /// Counts messages on `subject` that have not been acknowledged yet.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Unavailable` if the query fails.
    pub async fn unacked_count(&self, subject: &str) -> Result<i64, TransportError> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM channel_messages WHERE subject = $1 AND acked_at IS NULL",
        )
        .bind(subject)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| transport_error(&e))
    }

    /// Deletes messages on every subject that were acknowledged more than
    /// `retention` ago, returning how many were removed. Unacknowledged
    /// messages are never deleted.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Unavailable` if the delete fails.
    #[instrument(skip(self))]
    pub async fn purge_acked(&self, retention: Duration) -> Result<u64, TransportError> {
        let result = sqlx::query(
            r"DELETE FROM channel_messages
              WHERE acked_at IS NOT NULL
                AND acked_at < NOW() - make_interval(secs => $1)",
        )
        .bind(retention.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(|e| transport_error(&e))?;
        Ok(result.rows_affected())
    }

    /// Opens a subscription on `subject`.
    #[must_use]
    pub fn subscribe(&self, subject: impl Into<String>, options: SubscriptionOptions) -> PgSubscription {
        PgSubscription {
            pool: self.pool.clone(),
            subject: subject.into(),
            options,
            buffer: VecDeque::new(),
        }
    }
}

#[derive(Debug, FromRow)]
struct LeasedRow {
    id: i64,
    payload: Vec<u8>,
    attempts: i32,
}

/// A polling subscription on one subject.
#[derive(Debug)]
pub struct PgSubscription {
    pool: PgPool,
    subject: String,
    options: SubscriptionOptions,
    buffer: VecDeque<PgDelivery>,
}

impl PgSubscription {
    /// Leases up to `batch_size` due messages, oldest first.
    async fn lease(&self) -> Result<Vec<PgDelivery>, TransportError> {
        let mut rows: Vec<LeasedRow> = sqlx::query_as(
            r"UPDATE channel_messages
              SET attempts = attempts + 1,
                  deliver_after = NOW() + make_interval(secs => $3)
              WHERE id IN (
                  SELECT id FROM channel_messages
                  WHERE subject = $1 AND acked_at IS NULL AND deliver_after <= NOW()
                  ORDER BY id
                  LIMIT $2
                  FOR UPDATE SKIP LOCKED
              )
              RETURNING id, payload, attempts",
        )
        .bind(&self.subject)
        .bind(i64::from(self.options.batch_size))
        .bind(self.options.ack_wait.as_secs_f64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| transport_error(&e))?;
        rows.sort_by_key(|row| row.id);

        Ok(rows
            .into_iter()
            .map(|row| PgDelivery {
                pool: self.pool.clone(),
                id: row.id,
                payload: row.payload,
                attempt: u32::try_from(row.attempts).unwrap_or(u32::MAX),
            })
            .collect())
    }
}

#[async_trait]
impl MessageSource for PgSubscription {
    async fn next_delivery(&mut self) -> Result<Option<Box<dyn Delivery>>, TransportError> {
        loop {
            if let Some(delivery) = self.buffer.pop_front() {
                return Ok(Some(Box::new(delivery)));
            }
            let leased = self.lease().await?;
            if leased.is_empty() {
                tokio::time::sleep(self.options.poll_interval).await;
            } else {
                debug!(subject = %self.subject, count = leased.len(), "leased messages");
                self.buffer.extend(leased);
            }
        }
    }
}

/// A message leased from `channel_messages`.
#[derive(Debug)]
pub struct PgDelivery {
    pool: PgPool,
    id: i64,
    payload: Vec<u8>,
    attempt: u32,
}

#[async_trait]
impl Delivery for PgDelivery {
    fn message_id(&self) -> String {
        self.id.to_string()
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn attempt(&self) -> u32 {
        self.attempt
    }

    async fn ack(&self) -> Result<(), TransportError> {
        sqlx::query("UPDATE channel_messages SET acked_at = NOW() WHERE id = $1 AND acked_at IS NULL")
            .bind(self.id)
            .execute(&self.pool)
            .await
            .map_err(|e| TransportError::Ack {
                message_id: self.id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
