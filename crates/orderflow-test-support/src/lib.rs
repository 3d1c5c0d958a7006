//! Shared test doubles and fixtures for the Orderflow ingestion service.

mod channel;
mod fixtures;
mod repository;

pub use channel::{AckLog, InMemoryChannel, InMemoryDelivery, InMemorySource};
pub use fixtures::{sample_order, sample_order_json};
pub use repository::{FailingOrderRepository, InMemoryOrderRepository};
