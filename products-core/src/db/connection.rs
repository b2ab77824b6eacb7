//! Per-label connection configuration
//!
//! Decoded once from a `[databases.<label>]` table and never mutated.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::connector::SqliteConnector;
use crate::error::{ConfigError, Result};

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Driver {
    #[serde(rename = "sqlite3", alias = "sqlite")]
    Sqlite,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite3"),
        }
    }
}

/// A driver option value. Anything other than these variants is rejected
/// when the config is loaded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    /// Interpret the value as an on/off flag.
    pub fn as_flag(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Integer(n) => *n != 0,
            Self::Float(n) => *n != 0.0,
            Self::Text(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes"),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("true"),
            Self::Bool(false) => f.write_str("false"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Raw shape of a `[databases.<label>]` table
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConnectionConfig {
    driver: Driver,
    #[serde(rename = "filepath", alias = "file_path", default)]
    file_path: String,
    database: String,
    #[serde(default)]
    options: BTreeMap<String, OptionValue>,
    /// Minutes; 0 = unlimited
    #[serde(default)]
    conn_max_lifetime: u64,
    #[serde(default)]
    max_idle_conns: u32,
    #[serde(default)]
    max_open_conns: u32,
}

/// Immutable connection configuration for one label
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub driver: Driver,
    pub file_path: String,
    pub database: String,
    pub options: BTreeMap<String, OptionValue>,
    /// `None` means connections are never recycled by age
    pub max_lifetime: Option<Duration>,
    pub max_idle: u32,
    /// 0 means the driver default
    pub max_open: u32,
}

impl ConnectionConfig {
    /// Decode one labelled section.
    pub fn from_value(label: &str, value: &toml::Value) -> Result<Self> {
        let raw: RawConnectionConfig = value
            .clone()
            .try_into()
            .map_err(|e| ConfigError::invalid_connection(label, e))?;

        if raw.database.trim().is_empty() {
            return Err(ConfigError::invalid_connection(label, "database name is required"));
        }

        let max_lifetime = match raw.conn_max_lifetime {
            0 => None,
            minutes => Some(Duration::from_secs(minutes.checked_mul(60).ok_or_else(|| {
                ConfigError::invalid_connection(label, "conn_max_lifetime out of range")
            })?)),
        };

        let config = Self {
            driver: raw.driver,
            file_path: raw.file_path,
            database: raw.database,
            options: raw.options,
            max_lifetime,
            max_idle: raw.max_idle_conns,
            max_open: raw.max_open_conns,
        };

        // Driver options are checked here so a bad value fails at load time
        // instead of on every connection attempt.
        match config.driver {
            Driver::Sqlite => {
                SqliteConnector::connect_options(&config)
                    .map_err(|e| ConfigError::invalid_connection(label, e))?;
            }
        }

        Ok(config)
    }

    /// Path of the database file: `{file_path}{database}.db`
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(format!("{}{}.db", self.file_path, self.database))
    }

    /// Driver connection string: `file:{file_path}{database}.db?k=v&...`
    ///
    /// Options are emitted in key order.
    pub fn connection_string(&self) -> String {
        let mut dsn = format!("file:{}{}.db", self.file_path, self.database);
        if !self.options.is_empty() {
            let opts: Vec<String> = self
                .options
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            dsn.push('?');
            dsn.push_str(&opts.join("&"));
        }
        dsn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<ConnectionConfig> {
        let value: toml::Value = toml::from_str(src).unwrap();
        ConnectionConfig::from_value("test-db", &value)
    }

    #[test]
    fn connection_string_without_options() {
        let cfg = parse(
            r#"
            driver = "sqlite3"
            filepath = "./data/"
            database = "products"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.connection_string(), "file:./data/products.db");
        assert_eq!(cfg.database_path(), PathBuf::from("./data/products.db"));
    }

    #[test]
    fn connection_string_renders_booleans_and_numbers() {
        let cfg = parse(
            r#"
            driver = "sqlite"
            filepath = "/tmp/"
            database = "shop"

            [options]
            mode = "rwc"
            _foreign_keys = true
            cache_disabled = false
            _busy_timeout = 5000
            "#,
        )
        .unwrap();

        assert_eq!(
            cfg.connection_string(),
            "file:/tmp/shop.db?_busy_timeout=5000&_foreign_keys=true&cache_disabled=false&mode=rwc"
        );
    }

    #[test]
    fn pool_limits_are_decoded() {
        let cfg = parse(
            r#"
            driver = "sqlite3"
            database = "products"
            conn_max_lifetime = 5
            max_idle_conns = 2
            max_open_conns = 4
            "#,
        )
        .unwrap();

        assert_eq!(cfg.max_lifetime, Some(Duration::from_secs(300)));
        assert_eq!(cfg.max_idle, 2);
        assert_eq!(cfg.max_open, 4);
    }

    #[test]
    fn zero_lifetime_means_unlimited() {
        let cfg = parse("driver = \"sqlite3\"\ndatabase = \"p\"").unwrap();
        assert_eq!(cfg.max_lifetime, None);
    }

    #[test]
    fn oversized_lifetime_is_config_error() {
        let err = parse(
            r#"
            driver = "sqlite3"
            database = "p"
            conn_max_lifetime = 9000000000000000000
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("conn_max_lifetime out of range"));
    }

    #[test]
    fn rejects_bad_driver_options() {
        for option in [
            "_journal_mode = \"sideways\"",
            "mode = \"readonly\"",
            "mode = \"RO\"",
            "_busy_timeout = \"soon\"",
        ] {
            let src = format!("driver = \"sqlite3\"\ndatabase = \"p\"\n[options]\n{option}");
            let err = parse(&src).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidConnection { .. }),
                "{option} accepted"
            );
        }
    }

    #[test]
    fn rejects_unknown_driver() {
        let err = parse("driver = \"mysql\"\ndatabase = \"p\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConnection { .. }));
    }

    #[test]
    fn rejects_unsupported_option_type() {
        let err = parse(
            r#"
            driver = "sqlite3"
            database = "p"
            [options]
            pragmas = ["a", "b"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConnection { .. }));
    }

    #[test]
    fn rejects_blank_database() {
        let err = parse("driver = \"sqlite3\"\ndatabase = \"  \"").unwrap_err();
        assert!(err.to_string().contains("database name is required"));
    }

    #[test]
    fn option_flags() {
        assert!(OptionValue::Bool(true).as_flag());
        assert!(OptionValue::Text("ON".into()).as_flag());
        assert!(!OptionValue::Integer(0).as_flag());
        assert_eq!(OptionValue::Text("250".into()).as_integer(), Some(250));
    }
}
