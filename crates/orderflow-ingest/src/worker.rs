//! Bounded-concurrency worker that feeds deliveries through the ingestor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use orderflow_core::transport::{Delivery, MessageSource};

use crate::ingestor::{Disposition, OrderIngestor};

/// Worker tuning.
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    /// Maximum number of deliveries processed at the same time.
    pub max_in_flight: usize,
    /// Pause before asking the source again after a transport error.
    pub retry_backoff: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 8,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Counters describing one `run` of the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Deliveries acknowledged.
    pub acked: usize,
    /// Deliveries left unacknowledged for redelivery.
    pub deferred: usize,
    /// Deliveries whose acknowledgment failed.
    pub ack_failures: usize,
    /// Processing tasks that panicked.
    pub panicked: usize,
}

#[derive(Debug, Clone, Copy)]
enum Settled {
    Acked,
    Deferred,
    AckFailed,
}

/// Pulls deliveries from a `MessageSource` and processes them concurrently.
#[derive(Debug, Clone)]
pub struct IngestWorker {
    ingestor: Arc<OrderIngestor>,
    options: WorkerOptions,
}

impl IngestWorker {
    /// Creates a worker.
    ///
    /// # Panics
    ///
    /// Panics if `options.max_in_flight` is zero.
    #[must_use]
    pub fn new(ingestor: OrderIngestor, options: WorkerOptions) -> Self {
        assert!(options.max_in_flight > 0, "max_in_flight must be at least 1");
        Self {
            ingestor: Arc::new(ingestor),
            options,
        }
    }

    /// Runs until `shutdown` resolves or the source closes, then waits for
    /// in-flight deliveries to settle.
    pub async fn run<S, F>(&self, mut source: S, shutdown: F) -> WorkerStats
    where
        S: MessageSource,
        F: Future<Output = ()> + Send,
    {
        let semaphore = Arc::new(Semaphore::new(self.options.max_in_flight));
        let mut tasks: JoinSet<Settled> = JoinSet::new();
        let mut stats = WorkerStats::default();
        tokio::pin!(shutdown);

        info!(max_in_flight = self.options.max_in_flight, "ingest worker started");
        loop {
            while let Some(result) = tasks.try_join_next() {
                record(&mut stats, result);
            }

            let permit = tokio::select! {
                () = &mut shutdown => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let next = tokio::select! {
                () = &mut shutdown => break,
                next = source.next_delivery() => next,
            };

            match next {
                Ok(Some(delivery)) => {
                    let ingestor = Arc::clone(&self.ingestor);
                    tasks.spawn(async move {
                        let settled = settle(&ingestor, delivery).await;
                        drop(permit);
                        settled
                    });
                }
                Ok(None) => {
                    info!("order source closed");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "failed to receive from order source");
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(self.options.retry_backoff) => {}
                    }
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            record(&mut stats, result);
        }
        info!(
            acked = stats.acked,
            deferred = stats.deferred,
            ack_failures = stats.ack_failures,
            "ingest worker stopped"
        );
        stats
    }
}

async fn settle(ingestor: &OrderIngestor, delivery: Box<dyn Delivery>) -> Settled {
    let span = info_span!(
        "delivery",
        message_id = %delivery.message_id(),
        attempt = delivery.attempt(),
        correlation_id = %Uuid::new_v4(),
    );
    async move {
        match ingestor.handle(delivery.payload()).await {
            Disposition::Ack => match delivery.ack().await {
                Ok(()) => Settled::Acked,
                Err(err) => {
                    warn!(error = %err, "acknowledgment failed, message will be redelivered");
                    Settled::AckFailed
                }
            },
            Disposition::Retry => Settled::Deferred,
        }
    }
    .instrument(span)
    .await
}

fn record(stats: &mut WorkerStats, result: Result<Settled, tokio::task::JoinError>) {
    match result {
        Ok(Settled::Acked) => stats.acked += 1,
        Ok(Settled::Deferred) => stats.deferred += 1,
        Ok(Settled::AckFailed) => stats.ack_failures += 1,
        Err(err) => {
            error!(error = %err, "ingest task failed");
            stats.panicked += 1;
        }
    }
}
