//! Per-message ingestion pipeline.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use orderflow_cache::OrderCache;
use orderflow_core::error::{IngestError, StorageError};
use orderflow_core::model::Order;
use orderflow_core::repository::OrderRepository;

/// Successful outcome of processing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    /// The order was committed and cached.
    Stored,
    /// The order was already committed by an earlier delivery.
    AlreadyStored,
}

/// What the transport should do with a message once it has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledge: the message is stored or will never become valid.
    Ack,
    /// Leave unacknowledged so the transport redelivers it later.
    Retry,
}

/// Drives decoded orders through storage and into the cache.
#[derive(Clone)]
pub struct OrderIngestor {
    repository: Arc<dyn OrderRepository>,
    cache: OrderCache,
}

impl std::fmt::Debug for OrderIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderIngestor")
            .field("cached_orders", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl OrderIngestor {
    /// Creates an ingestor writing through `repository` into `cache`.
    #[must_use]
    pub fn new(repository: Arc<dyn OrderRepository>, cache: OrderCache) -> Self {
        Self { repository, cache }
    }

    /// Decodes, validates and stores one message, then updates the cache.
    ///
    /// A duplicate order is not an error: the stored aggregate is loaded to
    /// fill the cache if it is missing there.
    ///
    /// # Errors
    ///
    /// - `IngestError::MalformedPayload` if the body is not an order.
    /// - `IngestError::InvalidAggregate` if the order breaks an aggregate rule;
    ///   nothing is written in that case.
    /// - `IngestError::Storage` if persisting fails for any reason other than
    ///   a duplicate.
    #[instrument(skip_all, fields(order_uid = tracing::field::Empty))]
    pub async fn process(&self, payload: &[u8]) -> Result<Ingested, IngestError> {
        let order = Order::decode(payload)?;
        tracing::Span::current().record("order_uid", order.order_uid.as_str());
        order.validate()?;

        match self.repository.persist(&order).await {
            Ok(()) => {
                self.update_cache(&order);
                Ok(Ingested::Stored)
            }
            Err(StorageError::DuplicateOrder(order_uid)) => {
                if !self.cache.contains(&order_uid) {
                    match self.repository.load_by_identifier(&order_uid).await {
                        Ok(stored) => self.update_cache(&stored),
                        Err(err) => {
                            warn!(error = %err, "could not load duplicate order to heal cache");
                        }
                    }
                }
                Ok(Ingested::AlreadyStored)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Processes one message and decides how the transport should settle it.
    pub async fn handle(&self, payload: &[u8]) -> Disposition {
        match self.process(payload).await {
            Ok(Ingested::Stored) => {
                info!("order stored");
                Disposition::Ack
            }
            Ok(Ingested::AlreadyStored) => {
                info!("duplicate order delivery ignored");
                Disposition::Ack
            }
            Err(err) if err.is_retriable() => {
                error!(error = %err, "order not stored, leaving message for redelivery");
                Disposition::Retry
            }
            Err(err) => {
                warn!(error = %err, "dropping message");
                Disposition::Ack
            }
        }
    }

    /// The cache is a derived view; a failure here never fails the message.
    fn update_cache(&self, order: &Order) {
        if let Err(err) = self.cache.put_order(order) {
            warn!(error = %err, "cache update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_test_support::{
        FailingOrderRepository, InMemoryOrderRepository, sample_order, sample_order_json,
    };

    fn ingestor_with(repo: Arc<InMemoryOrderRepository>) -> (OrderIngestor, OrderCache) {
        let cache = OrderCache::new();
        (OrderIngestor::new(repo, cache.clone()), cache)
    }

    #[tokio::test]
    async fn test_valid_order_is_stored_then_cached() {
        // Arrange
        let repo = Arc::new(InMemoryOrderRepository::new());
        let (ingestor, cache) = ingestor_with(Arc::clone(&repo));
        let order = sample_order("O1");

        // Act
        let result = ingestor.process(&sample_order_json(&order)).await;

        // Assert
        assert_eq!(result.unwrap(), Ingested::Stored);
        assert_eq!(repo.stored_count(), 1);
        let cached = cache.get("O1").unwrap().to_order().unwrap();
        assert_eq!(cached, repo.load_by_identifier("O1").await.unwrap());
        assert_eq!(cached.items.len(), 1);
    }

    #[tokio::test]
    async fn test_redelivered_order_is_already_stored() {
        // Arrange
        let repo = Arc::new(InMemoryOrderRepository::new());
        let (ingestor, cache) = ingestor_with(Arc::clone(&repo));
        let payload = sample_order_json(&sample_order("O1"));
        ingestor.process(&payload).await.unwrap();
        let first = cache.get("O1").unwrap();

        // Act
        let result = ingestor.process(&payload).await;

        // Assert
        assert_eq!(result.unwrap(), Ingested::AlreadyStored);
        assert_eq!(repo.stored_count(), 1);
        assert_eq!(cache.get("O1").unwrap(), first);
    }

    #[tokio::test]
    async fn test_duplicate_heals_cache_miss_from_storage() {
        // Arrange
        let stored = sample_order("O1");
        let repo = Arc::new(InMemoryOrderRepository::with_orders([stored.clone()]));
        let (ingestor, cache) = ingestor_with(Arc::clone(&repo));
        let mut redelivered = stored.clone();
        redelivered.customer_id = "changed-upstream".to_owned();

        // Act
        let result = ingestor.process(&sample_order_json(&redelivered)).await;

        // Assert
        assert_eq!(result.unwrap(), Ingested::AlreadyStored);
        assert_eq!(cache.get("O1").unwrap().to_order().unwrap(), stored);
    }

    #[tokio::test]
    async fn test_duplicate_with_failing_load_still_succeeds() {
        // Arrange
        let repo = Arc::new(InMemoryOrderRepository::with_orders([sample_order("O1")]));
        repo.fail_loads_of("O1");
        let (ingestor, cache) = ingestor_with(Arc::clone(&repo));

        // Act
        let disposition = ingestor.handle(&sample_order_json(&sample_order("O1"))).await;

        // Assert
        assert_eq!(disposition, Disposition::Ack);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped_without_writes() {
        // Arrange
        let repo = Arc::new(InMemoryOrderRepository::new());
        let (ingestor, cache) = ingestor_with(Arc::clone(&repo));

        // Act
        let result = ingestor.process(b"{\"order_uid\": ").await;
        let disposition = ingestor.handle(b"{\"order_uid\": ").await;

        // Assert
        assert!(matches!(result, Err(IngestError::MalformedPayload(_))));
        assert_eq!(disposition, Disposition::Ack);
        assert_eq!(repo.persist_calls(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_payment_mismatch_is_rejected_before_any_write() {
        // Arrange
        let repo = Arc::new(InMemoryOrderRepository::new());
        let (ingestor, cache) = ingestor_with(Arc::clone(&repo));
        let mut order = sample_order("O1");
        order.payment.as_mut().unwrap().transaction = "O2".to_owned();

        // Act
        let result = ingestor.process(&sample_order_json(&order)).await;

        // Assert
        assert!(matches!(result, Err(IngestError::InvalidAggregate { .. })));
        assert_eq!(repo.persist_calls(), 0);
        assert_eq!(repo.stored_count(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_item_track_number_mismatch_leaves_no_lookupable_entry() {
        // Arrange
        let repo = Arc::new(InMemoryOrderRepository::new());
        let (ingestor, cache) = ingestor_with(Arc::clone(&repo));
        let mut order = sample_order("O2");
        order.items[0].track_number = "SOMETHING-ELSE".to_owned();

        // Act
        let disposition = ingestor.handle(&sample_order_json(&order)).await;

        // Assert
        assert_eq!(disposition, Disposition::Ack);
        assert!(cache.get("O2").is_none());
        assert_eq!(repo.persist_calls(), 0);
    }

    #[tokio::test]
    async fn test_nul_character_is_dropped_before_any_write() {
        // Arrange
        let repo = Arc::new(InMemoryOrderRepository::new());
        let (ingestor, cache) = ingestor_with(Arc::clone(&repo));
        let mut order = sample_order("O1");
        order.delivery.address = "Ploshad\u{0}Mira".to_owned();

        // Act
        let disposition = ingestor.handle(&sample_order_json(&order)).await;

        // Assert
        assert_eq!(disposition, Disposition::Ack);
        assert_eq!(repo.persist_calls(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_order_refused_by_storage_is_dropped() {
        // Arrange
        let repo = Arc::new(InMemoryOrderRepository::new());
        repo.set_reject_persist(true);
        let (ingestor, cache) = ingestor_with(Arc::clone(&repo));

        // Act
        let disposition = ingestor.handle(&sample_order_json(&sample_order("O1"))).await;

        // Assert
        assert_eq!(disposition, Disposition::Ack);
        assert_eq!(repo.persist_calls(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_storage_requests_redelivery() {
        // Arrange
        let cache = OrderCache::new();
        let ingestor = OrderIngestor::new(Arc::new(FailingOrderRepository), cache.clone());

        // Act
        let disposition = ingestor.handle(&sample_order_json(&sample_order("O1"))).await;

        // Assert
        assert_eq!(disposition, Disposition::Retry);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_message_succeeds_once_storage_recovers() {
        // Arrange
        let repo = Arc::new(InMemoryOrderRepository::new());
        repo.set_fail_persist(true);
        let (ingestor, cache) = ingestor_with(Arc::clone(&repo));
        let payload = sample_order_json(&sample_order("O1"));
        assert_eq!(ingestor.handle(&payload).await, Disposition::Retry);

        // Act
        repo.set_fail_persist(false);
        let disposition = ingestor.handle(&payload).await;

        // Assert
        assert_eq!(disposition, Disposition::Ack);
        assert!(cache.contains("O1"));
    }
}
