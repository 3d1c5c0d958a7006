//! Orderflow Core: order aggregate model and shared abstractions.
//!
//! This crate defines the order aggregate, its validation rules, the error
//! taxonomy of the ingestion pipeline and the traits the storage and
//! transport layers implement. It contains no infrastructure code.

pub mod document;
pub mod error;
pub mod model;
pub mod repository;
pub mod transport;
pub mod validation;
