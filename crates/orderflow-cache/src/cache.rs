//! Concurrent order cache.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, instrument, warn};

use orderflow_core::document::OrderDocument;
use orderflow_core::error::{CacheError, StorageError};
use orderflow_core::model::Order;
use orderflow_core::repository::OrderRepository;

/// Shared handle to the order cache. Clones refer to the same entries.
///
/// Entries are keyed by `order_uid` and never expire or get removed: orders
/// are immutable once committed.
#[derive(Debug, Clone, Default)]
pub struct OrderCache {
    entries: Arc<DashMap<String, OrderDocument>>,
}

/// Outcome of a warm-load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WarmLoadReport {
    /// Orders loaded into the cache.
    pub loaded: usize,
    /// Identifiers skipped because their order could not be loaded.
    pub skipped: usize,
}

impl OrderCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the cache with every committed order.
    ///
    /// Orders that fail to load or serialize are logged and skipped, leaving
    /// the cache with partial coverage.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the list of identifiers cannot be read.
    #[instrument(skip_all)]
    pub async fn warm_load(
        &self,
        repository: &dyn OrderRepository,
    ) -> Result<WarmLoadReport, StorageError> {
        let identifiers = repository.list_identifiers().await?;
        let mut report = WarmLoadReport::default();

        for order_uid in &identifiers {
            let order = match repository.load_by_identifier(order_uid).await {
                Ok(order) => order,
                Err(err) => {
                    warn!(%order_uid, error = %err, "skipping order during warm-load");
                    report.skipped += 1;
                    continue;
                }
            };
            match self.put_order(&order) {
                Ok(()) => report.loaded += 1,
                Err(err) => {
                    warn!(%order_uid, error = %err, "skipping order during warm-load");
                    report.skipped += 1;
                }
            }
        }

        info!(
            found = identifiers.len(),
            loaded = report.loaded,
            skipped = report.skipped,
            "cache warm-load complete"
        );
        Ok(report)
    }

    /// Inserts or replaces the entry for `order_uid`.
    pub fn put(&self, order_uid: impl Into<String>, document: OrderDocument) {
        self.entries.insert(order_uid.into(), document);
    }

    /// Serializes `order` and stores it under its `order_uid`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Serialization` if the order cannot be serialized;
    /// the cache is left unchanged.
    pub fn put_order(&self, order: &Order) -> Result<(), CacheError> {
        let document = OrderDocument::from_order(order)?;
        self.put(order.order_uid.clone(), document);
        Ok(())
    }

    /// Returns the cached document for `order_uid`, if any.
    #[must_use]
    pub fn get(&self, order_uid: &str) -> Option<OrderDocument> {
        self.entries.get(order_uid).map(|entry| entry.value().clone())
    }

    /// Returns `true` if `order_uid` is cached.
    #[must_use]
    pub fn contains(&self, order_uid: &str) -> bool {
        self.entries.contains_key(order_uid)
    }

    /// Number of cached orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
