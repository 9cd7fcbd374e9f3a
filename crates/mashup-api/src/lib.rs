//! Axum web front-end for the mashup builder.
//!
//! This crate provides:
//! - The HTML form page
//! - Job submission, progress polling, zip download and cancellation
//! - Per-IP rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use jobs::JobRegistry;
pub use routes::create_router;
pub use state::AppState;
