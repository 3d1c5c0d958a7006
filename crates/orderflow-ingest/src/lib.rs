//! Orderflow Ingest: bridges the order channel to storage and the cache.
//!
//! Each message moves through decode, validate, persist and cache update,
//! and is acknowledged only once it is either stored or deliberately
//! dropped. Messages that failed on a retriable storage error stay
//! unacknowledged so the transport redelivers them.

pub mod ingestor;
pub mod worker;
