//! Delivery contract between a message transport and the ingestion pipeline.
//!
//! A transport hands out deliveries one at a time. A delivery that is never
//! acknowledged is redelivered by the transport after its own redelivery
//! interval, so consumers only acknowledge once a message is fully handled.

use async_trait::async_trait;

use crate::error::TransportError;

/// A single message received from the order channel.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Transport-assigned identifier, used for logging.
    fn message_id(&self) -> String;

    /// The raw message body.
    fn payload(&self) -> &[u8];

    /// How many times this message has been handed out, starting at 1.
    fn attempt(&self) -> u32;

    /// Acknowledges the message so it is not redelivered.
    async fn ack(&self) -> Result<(), TransportError>;
}

/// A subscription that yields deliveries.
#[async_trait]
pub trait MessageSource: Send {
    /// Waits for the next delivery. Returns `Ok(None)` once the source is
    /// closed and will yield nothing more.
    async fn next_delivery(&mut self) -> Result<Option<Box<dyn Delivery>>, TransportError>;
}
