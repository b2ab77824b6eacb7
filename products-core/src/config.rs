//! Application configuration loaded from TOML
//!
//! Lookup order for the config file:
//! - explicit `--config` path
//! - `PRODUCTS_CONFIG` environment variable
//! - `config/products.toml` relative to the working directory

use serde::Deserialize;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "PRODUCTS_CONFIG";

/// Config path used when neither flag nor env var is set
pub const DEFAULT_CONFIG_PATH: &str = "config/products.toml";

/// Reserved key inside `[databases]` naming the default label
pub const DEFAULT_LABEL_KEY: &str = "default";

const PRODUCTION_ENV: &str = "prod";

/// Upper bound for `request_timeout_secs` (one day)
const MAX_REQUEST_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    pub databases: DatabasesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// Deployment environment; `prod` hides internal error detail
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default)]
    pub service: ServiceConfig,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            env: default_env(),
            service: ServiceConfig::default(),
        }
    }
}

fn default_env() -> String {
    "dev".to_string()
}

/// HTTP service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Allow any CORS origin (default: localhost only)
    pub cors_permissive: bool,
    /// Deadline applied to each request's database context
    pub request_timeout_secs: u64,
    /// Optional HTTPS listener served next to the plain one
    pub tls: TlsConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            cors_permissive: false,
            request_timeout_secs: 10,
            tls: TlsConfig::default(),
        }
    }
}

fn socket_addr(host: &str, port: u16, what: &str) -> Result<SocketAddr> {
    format!("{host}:{port}")
        .parse()
        .map_err(|e| ConfigError::invalid(format!("invalid {what} address: {e}")))
}

impl ServiceConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        socket_addr(&self.host, self.port, "service")
    }

    /// Per-request deadline. Must be between 1 second and one day.
    pub fn request_timeout(&self) -> Result<Duration> {
        match self.request_timeout_secs {
            0 => Err(ConfigError::invalid("request_timeout_secs must be at least 1")),
            secs if secs > MAX_REQUEST_TIMEOUT_SECS => Err(ConfigError::invalid(format!(
                "request_timeout_secs must not exceed {MAX_REQUEST_TIMEOUT_SECS}"
            ))),
            secs => Ok(Duration::from_secs(secs)),
        }
    }
}

/// `[app.service.tls]`: PEM certificate chain and private key for HTTPS
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub certificate: PathBuf,
    pub key: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 3443,
            certificate: PathBuf::new(),
            key: PathBuf::new(),
        }
    }
}

impl TlsConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        socket_addr(&self.host, self.port, "tls")
    }

    /// An enabled listener needs both PEM paths.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.certificate.as_os_str().is_empty() {
            return Err(ConfigError::invalid("tls.certificate is required when tls is enabled"));
        }
        if self.key.as_os_str().is_empty() {
            return Err(ConfigError::invalid("tls.key is required when tls is enabled"));
        }
        self.bind_addr().map(|_| ())
    }
}

/// The `[databases]` table: a `default` label plus one sub-table per label.
///
/// Kept as a raw table so every key except `default` can be decoded into a
/// connection config by the registry, reporting errors per label.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct DatabasesConfig(toml::Table);

impl DatabasesConfig {
    pub fn from_table(table: toml::Table) -> Self {
        Self(table)
    }

    /// The configured default label, if present as a string.
    pub fn default_label(&self) -> Option<&str> {
        self.0.get(DEFAULT_LABEL_KEY).and_then(|v| v.as_str())
    }

    /// Every labelled connection section, excluding the reserved `default` key.
    pub fn connections(&self) -> impl Iterator<Item = (&str, &toml::Value)> {
        self.0
            .iter()
            .filter(|(key, _)| key.as_str() != DEFAULT_LABEL_KEY)
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl AppConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse config from an in-memory TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Pick the config path: explicit flag, then `PRODUCTS_CONFIG`, then the default.
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn is_production(&self) -> bool {
        self.app.env == PRODUCTION_ENV
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [app]
        env = "prod"

        [app.service]
        port = 8080

        [databases]
        default = "readwrite-db"

        [databases.readwrite-db]
        driver = "sqlite3"
        filepath = "./data/"
        database = "products"
    "#;

    #[test]
    fn parses_sample_config() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.is_production());
        assert_eq!(config.app.service.port, 8080);
        assert_eq!(config.app.service.host, "127.0.0.1");
        assert_eq!(config.databases.default_label(), Some("readwrite-db"));

        let labels: Vec<_> = config.databases.connections().map(|(k, _)| k).collect();
        assert_eq!(labels, vec!["readwrite-db"]);
    }

    #[test]
    fn service_defaults_when_app_section_missing() {
        let config = AppConfig::from_toml_str("[databases]\ndefault = \"a\"").unwrap();
        assert!(!config.is_production());
        assert_eq!(config.app.service.bind_addr().unwrap().port(), 3030);
        assert_eq!(
            config.app.service.request_timeout().unwrap(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let config = AppConfig::from_toml_str(
            "[app.service]\nrequest_timeout_secs = 0\n[databases]\ndefault = \"a\"",
        )
        .unwrap();
        let err = config.app.service.request_timeout().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn huge_request_timeout_is_rejected() {
        let config = AppConfig::from_toml_str(concat!(
            "[app.service]\n",
            "request_timeout_secs = 9223372036854775807\n",
            "[databases]\n",
            "default = \"a\"",
        ))
        .unwrap();
        let err = config.app.service.request_timeout().unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
    }

    #[test]
    fn tls_is_disabled_by_default() {
        let config = AppConfig::from_toml_str("[databases]\ndefault = \"a\"").unwrap();
        let tls = &config.app.service.tls;
        assert!(!tls.enabled);
        assert_eq!(tls.bind_addr().unwrap().port(), 3443);
        tls.validate().unwrap();
    }

    #[test]
    fn parses_tls_section() {
        let config = AppConfig::from_toml_str(
            r#"
            [app.service.tls]
            enabled = true
            host = "0.0.0.0"
            port = 8443
            certificate = "certs/server.crt"
            key = "certs/server.key"

            [databases]
            default = "a"
            "#,
        )
        .unwrap();
        let tls = &config.app.service.tls;
        assert!(tls.enabled);
        assert_eq!(tls.bind_addr().unwrap(), "0.0.0.0:8443".parse().unwrap());
        assert_eq!(tls.certificate, PathBuf::from("certs/server.crt"));
        assert_eq!(tls.key, PathBuf::from("certs/server.key"));
        tls.validate().unwrap();
    }

    #[test]
    fn enabled_tls_requires_certificate_and_key() {
        let mut tls = TlsConfig {
            enabled: true,
            key: PathBuf::from("server.key"),
            ..TlsConfig::default()
        };
        let err = tls.validate().unwrap_err();
        assert!(err.to_string().contains("tls.certificate"));

        tls.certificate = PathBuf::from("server.crt");
        tls.key = PathBuf::new();
        let err = tls.validate().unwrap_err();
        assert!(err.to_string().contains("tls.key"));
    }

    #[test]
    fn missing_databases_table_is_parse_error() {
        let err = AppConfig::from_toml_str("[app]\nenv = \"dev\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.databases.default_label(), Some("readwrite-db"));
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = AppConfig::load(Path::new("/nonexistent/products.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn explicit_path_wins() {
        let path = AppConfig::resolve_path(Some(PathBuf::from("custom.toml")));
        assert_eq!(path, PathBuf::from("custom.toml"));
    }
}
