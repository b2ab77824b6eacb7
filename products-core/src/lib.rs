//! products-core: configuration and the database connection layer
//!
//! The connection layer resolves a logical label ("readwrite-db",
//! "readonly-db", ...) to a live, pinged connection pool, creating pools
//! lazily and retrying under exponential backoff.

pub mod config;
pub mod db;
pub mod error;

pub use config::{AppConfig, DatabasesConfig, ServiceConfig, TlsConfig};
pub use db::{Context, Database, ResolveError};
pub use error::ConfigError;
