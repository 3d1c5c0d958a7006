//! Order lookup routes.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use orderflow_cache::query::lookup_order;
use orderflow_core::document::OrderDocument;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /{order_uid}
#[instrument(skip(state))]
async fn get_order(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
) -> Result<Json<OrderDocument>, ApiError> {
    match lookup_order(&state.cache, &order_uid) {
        Some(document) => Ok(Json(document)),
        None => {
            debug!("order not in cache");
            Err(ApiError::OrderNotFound(order_uid))
        }
    }
}

/// Returns the router for order lookups.
pub fn router() -> Router<AppState> {
    Router::new().route("/{order_uid}", get(get_order))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use orderflow_cache::OrderCache;
    use orderflow_test_support::sample_order;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app_with(cache: OrderCache) -> Router {
        router().with_state(AppState::new(cache))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn test_get_cached_order_returns_200_with_document() {
        // Arrange
        let cache = OrderCache::new();
        cache.put_order(&sample_order("O1")).unwrap();

        // Act
        let (status, json) = get(app_with(cache), "/O1").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["order_uid"], "O1");
        assert_eq!(json["payment"]["transaction"], "O1");
        assert_eq!(json["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_order_returns_404() {
        // Act
        let (status, json) = get(app_with(OrderCache::new()), "/missing").await;

        // Assert
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "order_not_found");
        assert_eq!(json["message"], "order not found: missing");
    }
}
