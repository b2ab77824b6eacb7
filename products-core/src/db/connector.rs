//! Driver seam: how a pool is opened and pinged
//!
//! The resolver only talks to a `Connector`, so tests can swap in doubles that
//! count creations or fail on demand.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Connection;

use super::connection::ConnectionConfig;

/// Used when `max_open_conns` is 0
const DEFAULT_MAX_OPEN: u32 = 10;

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Pool: Clone + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a pool for `config`, applying its limits. Must not require a
    /// reachable database; liveness is checked separately by `ping`.
    async fn open(
        &self,
        label: &str,
        config: &ConnectionConfig,
    ) -> Result<Self::Pool, Self::Error>;

    /// Round-trip against the pool's underlying store.
    async fn ping(&self, pool: &Self::Pool) -> Result<(), Self::Error>;
}

fn invalid_option(key: &str, value: &str) -> sqlx::Error {
    sqlx::Error::Configuration(format!("unsupported value '{value}' for option '{key}'").into())
}

/// sqlx-backed SQLite connector
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl SqliteConnector {
    /// Translate a connection config into sqlx connect options.
    ///
    /// Recognised option keys (a leading `_` is ignored): `mode`
    /// (`ro`/`rw`/`rwc`/`memory`), `cache` (`shared`/`private`),
    /// `foreign_keys`/`fk`, `busy_timeout` (ms), `journal_mode`. Anything
    /// else is passed through as a PRAGMA. Unknown values for recognised
    /// keys are errors.
    pub fn connect_options(
        config: &ConnectionConfig,
    ) -> Result<SqliteConnectOptions, sqlx::Error> {
        let mut options = SqliteConnectOptions::new().filename(config.database_path());

        for (key, value) in &config.options {
            options = match key.trim_start_matches('_') {
                "mode" => match value.to_string().as_str() {
                    "ro" => options.read_only(true),
                    "rw" => options.create_if_missing(false),
                    "rwc" => options.create_if_missing(true),
                    "memory" => options.in_memory(true),
                    other => return Err(invalid_option(key, other)),
                },
                "cache" => match value.to_string().as_str() {
                    "shared" => options.shared_cache(true),
                    "private" => options.shared_cache(false),
                    other => return Err(invalid_option(key, other)),
                },
                "foreign_keys" | "fk" => options.foreign_keys(value.as_flag()),
                "busy_timeout" => match value.as_integer() {
                    Some(ms) if ms >= 0 => options.busy_timeout(Duration::from_millis(ms as u64)),
                    _ => return Err(invalid_option(key, &value.to_string())),
                },
                "journal_mode" => {
                    options.journal_mode(SqliteJournalMode::from_str(&value.to_string())?)
                }
                pragma => options.pragma(pragma.to_owned(), value.to_string()),
            };
        }

        Ok(options)
    }

    /// Pool limits from the config.
    ///
    /// sqlx has no idle-count cap; `max_idle_conns` becomes the number of
    /// connections the pool keeps warm.
    pub fn pool_options(config: &ConnectionConfig) -> SqlitePoolOptions {
        let max_open = match config.max_open {
            0 => DEFAULT_MAX_OPEN,
            n => n,
        };

        SqlitePoolOptions::new()
            .max_connections(max_open)
            .min_connections(config.max_idle.min(max_open))
            .max_lifetime(config.max_lifetime)
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    type Pool = SqlitePool;
    type Error = sqlx::Error;

    async fn open(
        &self,
        label: &str,
        config: &ConnectionConfig,
    ) -> Result<SqlitePool, sqlx::Error> {
        let options = Self::connect_options(config)?;
        tracing::debug!(label, path = %config.database_path().display(), "opening sqlite pool");
        Ok(Self::pool_options(config).connect_lazy_with(options))
    }

    async fn ping(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        let mut conn = pool.acquire().await?;
        conn.ping().await
    }
}
