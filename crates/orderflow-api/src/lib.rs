//! Orderflow API: HTTP lookup of cached orders and process bootstrap.

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
