//! Order repository abstraction.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::model::Order;

/// Durable, transactional storage of order aggregates.
///
/// Implementations must be safe to call concurrently. Two concurrent
/// `persist` calls for the same `order_uid` must leave exactly one stored
/// aggregate, with the loser observing `StorageError::DuplicateOrder`.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores the whole aggregate atomically, or nothing at all.
    async fn persist(&self, order: &Order) -> Result<(), StorageError>;

    /// Returns every committed order identifier.
    async fn list_identifiers(&self) -> Result<Vec<String>, StorageError>;

    /// Composes the stored aggregate for `order_uid`.
    async fn load_by_identifier(&self, order_uid: &str) -> Result<Order, StorageError>;
}
