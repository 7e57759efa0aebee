//! cart-service: keeps each user's shopping cart as an unpaid invoice.
pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

pub use error::CartError;
pub use startup::{AppState, Application};
