/// Structured error types for products-core.
///
/// Library consumers get `thiserror` enums; the `products` binary wraps them
/// with `anyhow` context at the edges.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML or does not match the expected shape
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// `databases.default` is absent or blank
    #[error("a default database connection label is required")]
    MissingDefault,

    /// `databases.default` names a label with no connection section
    #[error("default database label '{label}' has no connection configuration")]
    UnknownDefault { label: String },

    /// A per-label connection section is malformed
    #[error("invalid database configuration for '{label}': {reason}")]
    InvalidConnection { label: String, reason: String },

    /// Any other invalid setting
    #[error("configuration error: {reason}")]
    Invalid { reason: String },
}

/// Result type alias for products-core configuration
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Create an invalid connection error for a label
    pub fn invalid_connection(label: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidConnection {
            label: label.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a generic invalid configuration error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}
