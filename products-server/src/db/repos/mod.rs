//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Reads resolve the read-only pool, writes the read-write pool
//! - Ids match case-insensitively (`COLLATE NOCASE`)
//! - Multi-step deletes run in one transaction

pub mod products;
pub mod options;

use std::future::Future;

use products_core::db::DoneReason;
use products_core::{Context, ResolveError};

pub use products::ProductRepo;
pub use options::OptionRepo;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Unavailable(#[from] ResolveError),

    #[error("query aborted: {0}")]
    Cancelled(DoneReason),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },
}

/// Drive a query to completion unless `ctx` finishes first.
pub(crate) async fn bounded<T, F>(ctx: &Context, query: F) -> Result<T, DbError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    tokio::select! {
        biased;
        _ = ctx.done() => Err(DbError::Cancelled(
            ctx.done_reason().unwrap_or(DoneReason::Cancelled),
        )),
        result = query => result.map_err(DbError::from),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn bounded_stops_at_deadline() {
        let ctx = Context::background().with_timeout(Duration::from_millis(50));
        let err = bounded(&ctx, std::future::pending::<Result<(), sqlx::Error>>())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Cancelled(DoneReason::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn bounded_passes_results_through() {
        let ctx = Context::background();
        let value = bounded(&ctx, async { Ok::<_, sqlx::Error>(3) }).await.unwrap();
        assert_eq!(value, 3);
    }
}
