//! Orderflow Cache: the in-process read view of committed orders.
//!
//! The cache is filled once from storage at startup (`warm_load`) and then
//! kept current by the ingestion pipeline, which only writes an entry after
//! the order has been committed. Lookups never touch storage.

mod cache;
pub mod query;

pub use cache::{OrderCache, WarmLoadReport};
