//! Error types shared across the ingestion pipeline.

use thiserror::Error;

/// Errors reported by an `OrderRepository`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An order with this identifier is already committed.
    #[error("duplicate order: {0}")]
    DuplicateOrder(String),

    /// No order header matches the identifier.
    #[error("order not found: {0}")]
    NotFound(String),

    /// Stored rows for an order do not compose into a full aggregate.
    #[error("inconsistent order {order_uid}: {reason}")]
    Inconsistent {
        /// The order whose rows are inconsistent.
        order_uid: String,
        /// What is missing or malformed.
        reason: String,
    },

    /// The database refused the data itself, so retrying cannot succeed.
    #[error("order rejected by storage: {0}")]
    Rejected(String),

    /// The database could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(String),
}

impl StorageError {
    /// Returns `true` if retrying the same operation later may succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Database(_))
    }
}

/// Errors raised while turning an inbound message into a stored order.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The message body does not parse into an order.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The order parsed but breaks an aggregate rule.
    #[error("invalid order {order_uid:?}: {reason}")]
    InvalidAggregate {
        /// Identifier of the rejected order (may be empty).
        order_uid: String,
        /// The rule that was broken.
        reason: String,
    },

    /// Persisting the order failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Returns `true` if the message should be redelivered rather than dropped.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::MalformedPayload(_) | Self::InvalidAggregate { .. } => false,
            Self::Storage(err) => err.is_retriable(),
        }
    }
}

/// Errors raised by a message transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport backend could not be reached.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The delivery could not be acknowledged.
    #[error("acknowledgment failed for message {message_id}: {reason}")]
    Ack {
        /// Transport-assigned message identifier.
        message_id: String,
        /// Why the acknowledgment failed.
        reason: String,
    },
}

/// Errors raised by the order cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The order could not be serialized into its cached form.
    #[error("failed to serialize order {order_uid}: {reason}")]
    Serialization {
        /// The order that failed to serialize.
        order_uid: String,
        /// Serializer error message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_retriability() {
        assert!(StorageError::Unavailable("down".into()).is_retriable());
        assert!(StorageError::Database("deadlock".into()).is_retriable());
        assert!(!StorageError::DuplicateOrder("o1".into()).is_retriable());
        assert!(!StorageError::NotFound("o1".into()).is_retriable());
        assert!(!StorageError::Rejected("value too long".into()).is_retriable());
    }

    #[test]
    fn test_message_level_errors_are_not_retriable() {
        assert!(!IngestError::MalformedPayload("eof".into()).is_retriable());
        assert!(
            !IngestError::InvalidAggregate {
                order_uid: "o1".into(),
                reason: "bad".into(),
            }
            .is_retriable()
        );
        assert!(IngestError::from(StorageError::Unavailable("down".into())).is_retriable());
    }
}
