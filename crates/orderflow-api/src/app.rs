//! Router assembly.

use axum::Router;

use crate::routes;
use crate::state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::result::router())
        .nest("/api/v1/orders", routes::orders::router())
        .with_state(state)
}
