//! Read-only order lookup served from the cache.

use orderflow_core::document::OrderDocument;

use crate::cache::OrderCache;

/// Looks up an order by identifier.
///
/// Backed exclusively by the cache: a miss is `None` and never falls back to
/// storage, so lookups stay fast while storage is degraded.
#[must_use]
pub fn lookup_order(cache: &OrderCache, order_uid: &str) -> Option<OrderDocument> {
    cache.get(order_uid)
}
