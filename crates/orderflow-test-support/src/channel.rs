//! In-memory order channel: a `MessageSource` fed through a tokio mpsc
//! channel, recording which deliveries were acknowledged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use orderflow_core::error::TransportError;
use orderflow_core::transport::{Delivery, MessageSource};
use tokio::sync::mpsc;

/// Publishing side of the in-memory channel. Dropping every clone closes the
/// paired `InMemorySource`; use `ack_log` to observe acknowledgments after
/// that.
#[derive(Debug, Clone)]
pub struct InMemoryChannel {
    sender: mpsc::UnboundedSender<InMemoryDelivery>,
    next_id: Arc<AtomicU64>,
    acked: AckLog,
}

/// Shared record of acknowledged message ids.
#[derive(Debug, Clone, Default)]
pub struct AckLog(Arc<Mutex<Vec<String>>>);

impl AckLog {
    /// Ids of acknowledged messages, in acknowledgment order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Subscribing side of the in-memory channel.
#[derive(Debug)]
pub struct InMemorySource {
    receiver: mpsc::UnboundedReceiver<InMemoryDelivery>,
}

/// A delivery from the in-memory channel.
#[derive(Debug)]
pub struct InMemoryDelivery {
    id: String,
    payload: Vec<u8>,
    attempt: u32,
    acked: AckLog,
}

impl InMemoryChannel {
    /// Creates a connected channel/source pair.
    #[must_use]
    pub fn new() -> (Self, InMemorySource) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let channel = Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
            acked: AckLog::default(),
        };
        (channel, InMemorySource { receiver })
    }

    /// Publishes `payload` and returns its message id. Messages published
    /// after the source is dropped are discarded.
    pub fn publish(&self, payload: impl Into<Vec<u8>>) -> String {
        self.publish_attempt(payload, 1)
    }

    /// Publishes `payload` as if it were being redelivered for the given attempt.
    pub fn publish_attempt(&self, payload: impl Into<Vec<u8>>, attempt: u32) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let delivery = InMemoryDelivery {
            id: id.clone(),
            payload: payload.into(),
            attempt,
            acked: self.acked.clone(),
        };
        let _ = self.sender.send(delivery);
        id
    }

    /// Handle on the acknowledgment record that outlives the channel.
    #[must_use]
    pub fn ack_log(&self) -> AckLog {
        self.acked.clone()
    }
}

#[async_trait]
impl MessageSource for InMemorySource {
    async fn next_delivery(&mut self) -> Result<Option<Box<dyn Delivery>>, TransportError> {
        Ok(self
            .receiver
            .recv()
            .await
            .map(|delivery| Box::new(delivery) as Box<dyn Delivery>))
    }
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn message_id(&self) -> String {
        self.id.clone()
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn attempt(&self) -> u32 {
        self.attempt
    }

    async fn ack(&self) -> Result<(), TransportError> {
        self.acked.0.lock().unwrap().push(self.id.clone());
        Ok(())
    }
}
