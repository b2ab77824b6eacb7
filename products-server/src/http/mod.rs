//! HTTP server layer
//!
//! Axum server with:
//! - CORS (localhost only by default)
//! - Request tracing and request ids
//! - Graceful shutdown
//! - JSON error envelopes

pub mod server;
pub mod error;
pub mod extractors;
pub mod routes;

pub use server::{build_app, run_server, AppState, ServerConfig, ServerError, TlsSettings};
pub use error::ApiError;
