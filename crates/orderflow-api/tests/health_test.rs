//! Integration tests for the health endpoint.

mod common;

use axum::http::StatusCode;
use orderflow_cache::OrderCache;
use orderflow_test_support::sample_order;

#[tokio::test]
async fn test_health_returns_200_with_status_ok() {
    let app = common::build_test_app(OrderCache::new());

    let (status, json) = common::get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["cached_orders"], 0);
}

#[tokio::test]
async fn test_health_reports_cached_order_count() {
    let cache = OrderCache::new();
    cache.put_order(&sample_order("O1")).unwrap();
    cache.put_order(&sample_order("O2")).unwrap();
    let app = common::build_test_app(cache);

    let (_, json) = common::get_json(app, "/health").await;

    assert_eq!(json["cached_orders"], 2);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = common::build_test_app(OrderCache::new());

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/nonexistent")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
