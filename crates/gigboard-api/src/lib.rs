//! Axum HTTP API server for the Gigboard job marketplace.
//!
//! This crate provides:
//! - Cookie-based session auth (httpOnly JWT cookie)
//! - Ownership authorization for job postings and accepted tasks
//! - Prometheus metrics and structured request logging

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
