//! Database connection layer
//!
//! - `Registry` holds one entry per configured label
//! - `PoolResolver` turns a label into a live pool, retrying under backoff
//! - `Database` exposes the read-write and read-only roles over SQLite

pub mod connection;
pub mod connector;
pub mod context;
pub mod registry;
pub mod resolver;
pub mod retry;

use std::sync::Arc;

use sqlx::SqlitePool;

pub use connection::{ConnectionConfig, Driver, OptionValue};
pub use connector::{Connector, SqliteConnector};
pub use context::{Context, DoneReason};
pub use registry::Registry;
pub use resolver::{PoolResolver, ResolveError};
pub use retry::{BackoffPolicy, RetryError};

use crate::config::DatabasesConfig;
use crate::error::Result;

/// Label used for read-only access when configured
pub const READONLY_LABEL: &str = "readonly-db";

/// Read-write / read-only access to the configured SQLite databases
#[derive(Clone)]
pub struct Database {
    resolver: PoolResolver<SqliteConnector>,
}

impl Database {
    /// Build the registry from `[databases]`. No connection is opened yet.
    pub fn connect(config: &DatabasesConfig) -> Result<Self> {
        let registry = Registry::initialize(config)?;
        Ok(Self::with_resolver(PoolResolver::new(
            Arc::new(registry),
            SqliteConnector,
        )))
    }

    pub fn with_resolver(resolver: PoolResolver<SqliteConnector>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PoolResolver<SqliteConnector> {
        &self.resolver
    }

    /// Read-write pool (default label)
    pub async fn rw(&self, ctx: &Context) -> std::result::Result<SqlitePool, ResolveError> {
        self.resolver.resolve(ctx, None).await
    }

    /// Read-only pool: `readonly-db` when configured, else the default label
    pub async fn ro(&self, ctx: &Context) -> std::result::Result<SqlitePool, ResolveError> {
        let registry = self.resolver.registry();
        let label = if registry.contains(READONLY_LABEL).await {
            READONLY_LABEL
        } else {
            registry.default_label()
        };
        self.resolver.resolve(ctx, Some(label)).await
    }

    /// Resolve every configured label, reporting each outcome.
    pub async fn check(
        &self,
        ctx: &Context,
    ) -> Vec<(String, std::result::Result<(), ResolveError>)> {
        let mut results = Vec::new();
        for label in self.resolver.registry().labels().await {
            let outcome = self.resolver.resolve(ctx, Some(&label)).await.map(|_| ());
            results.push((label, outcome));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn databases(dir: &std::path::Path, with_readonly: bool) -> DatabasesConfig {
        let mut src = format!(
            r#"
            default = "readwrite-db"
            [readwrite-db]
            driver = "sqlite3"
            filepath = "{dir}/"
            database = "products"
            max_open_conns = 1
            [readwrite-db.options]
            mode = "rwc"
            "#,
            dir = dir.display()
        );
        if with_readonly {
            src.push_str(&format!(
                r#"
                [readonly-db]
                driver = "sqlite3"
                filepath = "{dir}/"
                database = "products"
                [readonly-db.options]
                mode = "ro"
                "#,
                dir = dir.display()
            ));
        }
        DatabasesConfig::from_table(toml::from_str(&src).unwrap())
    }

    #[tokio::test]
    async fn rw_and_ro_share_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(&databases(dir.path(), true)).unwrap();
        let ctx = Context::background();

        let rw = db.rw(&ctx).await.unwrap();
        sqlx::query("CREATE TABLE t (v INTEGER)").execute(&rw).await.unwrap();
        sqlx::query("INSERT INTO t VALUES (7)").execute(&rw).await.unwrap();

        let ro = db.ro(&ctx).await.unwrap();
        let (v,): (i64,) = sqlx::query_as("SELECT v FROM t").fetch_one(&ro).await.unwrap();
        assert_eq!(v, 7);

        // The read-only pool refuses writes.
        assert!(sqlx::query("INSERT INTO t VALUES (8)").execute(&ro).await.is_err());
    }

    #[tokio::test]
    async fn ro_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(&databases(dir.path(), false)).unwrap();
        let ctx = Context::background();

        let ro = db.ro(&ctx).await.unwrap();
        sqlx::query("CREATE TABLE t (v INTEGER)").execute(&ro).await.unwrap();
    }

    #[tokio::test]
    async fn check_reports_each_label() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(&databases(&dir.path().join("absent"), true)).unwrap();
        let db = Database::with_resolver(
            db.resolver().clone().with_policy(
                BackoffPolicy::default().with_max_elapsed_time(Duration::from_secs(1)),
            ),
        );

        let results = db.check(&Context::background()).await;
        let labels: Vec<_> = results.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["readonly-db", "readwrite-db"]);
        // Neither file can be opened inside a missing directory.
        assert!(results.iter().all(|(_, r)| r.is_err()));
    }
}
