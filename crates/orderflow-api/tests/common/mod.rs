//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use orderflow_cache::OrderCache;
use orderflow_core::repository::OrderRepository;
use orderflow_ingest::ingestor::OrderIngestor;
use orderflow_ingest::worker::{IngestWorker, WorkerOptions, WorkerStats};
use orderflow_store::pg_channel::{PgChannel, SubscriptionOptions};
use orderflow_store::pg_order_repository::PgOrderRepository;
use sqlx::PgPool;
use tower::ServiceExt;

use orderflow_api::app::build_router;
use orderflow_api::state::AppState;

/// Subject used by every integration test.
pub const SUBJECT: &str = "orders";

/// Build the full app router over `cache`. Uses the same route structure as
/// `main.rs`.
pub fn build_test_app(cache: OrderCache) -> Router {
    build_router(AppState::new(cache))
}

/// Publish raw payloads onto the test subject.
pub async fn publish(pool: &PgPool, payloads: &[Vec<u8>]) {
    let channel = PgChannel::new(pool.clone());
    for payload in payloads {
        channel.publish(SUBJECT, payload).await.unwrap();
    }
}

/// Run the ingest worker against the test subject until every published
/// message has been acknowledged.
pub async fn ingest_all(pool: &PgPool, cache: &OrderCache) -> WorkerStats {
    let channel = PgChannel::new(pool.clone());
    let subscription = channel.subscribe(
        SUBJECT,
        SubscriptionOptions {
            poll_interval: Duration::from_millis(10),
            ..SubscriptionOptions::default()
        },
    );
    let repository: Arc<dyn OrderRepository> = Arc::new(PgOrderRepository::new(pool.clone()));
    let worker = IngestWorker::new(
        OrderIngestor::new(repository, cache.clone()),
        WorkerOptions::default(),
    );

    let drained = async move {
        while channel.unacked_count(SUBJECT).await.unwrap() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    tokio::time::timeout(Duration::from_secs(10), worker.run(subscription, drained))
        .await
        .expect("ingest did not drain the channel in time")
}

/// Count the rows in `table`.
pub async fn row_count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a form-encoded POST request and return the response.
pub async fn post_form(app: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_owned()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
