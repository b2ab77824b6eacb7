//! products-server: HTTP API for products and their options
//!
//! Routes live under `/api/products`; every handler resolves its database
//! pool through `products_core::Database` under a per-request deadline.

pub mod db;
pub mod http;
pub mod models;

pub use db::{bootstrap, DbError};
pub use http::{
    build_app, run_server, ApiError, AppState, ServerConfig, ServerError, TlsSettings,
};
