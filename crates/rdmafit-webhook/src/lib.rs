//! Rdmafit Webhook - HTTP front end of the RDMA scheduler extender
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - The extender filter endpoint
//! - Health endpoints

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

// Re-export commonly used types
pub use error::{ApiError, Result};
pub use server::{Config, WebhookServer, DEFAULT_PORT, FILTER_PATH};
pub use state::AppState;
