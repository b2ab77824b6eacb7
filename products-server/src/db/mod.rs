//! Database layer - schema bootstrap and repositories
//!
//! Reads go through the read-only role, writes through the read-write role.
//! Pools come from `products_core::Database`, so every call resolves (and
//! if needed retries) its connection under the request's `Context`.

pub mod repos;
pub mod schema;

pub use repos::*;
pub use schema::bootstrap;
