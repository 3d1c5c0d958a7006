//! Orderflow Store: PostgreSQL implementations of the order repository and
//! of the durable order channel.

mod error;
pub mod pg_channel;
pub mod pg_order_repository;

/// Migrations for every table this crate reads or writes.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
