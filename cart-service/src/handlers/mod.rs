//! HTTP handlers for cart-service.

pub mod health;
pub mod invoices;

pub use health::{health_check, metrics, readiness_check};
