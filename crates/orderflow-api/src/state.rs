//! Shared application state.

use orderflow_cache::OrderCache;

/// Application state shared across all request handlers.
///
/// Handlers only read from the cache; they never reach storage.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The order cache filled by warm-load and the ingest worker.
    pub cache: OrderCache,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(cache: OrderCache) -> Self {
        Self { cache }
    }
}
