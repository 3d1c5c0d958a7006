//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orderflow_core::error::StorageError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the service process.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Warm-load could not read from storage.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Tracing or exporter setup failed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// Errors surfaced by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No cached order has this identifier.
    #[error("order not found: {0}")]
    OrderNotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "order_not_found"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_not_found_maps_to_404() {
        let response = ApiError::OrderNotFound("O1".into()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_startup_failures_convert_into_app_error() {
        let storage = AppError::from(StorageError::Unavailable("down".into()));
        let server = AppError::from(std::io::Error::from(std::io::ErrorKind::AddrInUse));
        let database = AppError::from(sqlx::Error::PoolTimedOut);

        assert!(matches!(storage, AppError::Storage(_)));
        assert!(matches!(server, AppError::Server(_)));
        assert!(matches!(database, AppError::Database(_)));
        assert_eq!(storage.to_string(), "storage error: storage unavailable: down");
    }
}
