//! Connection registry: label → (config, lazily created pool)
//!
//! Built once at startup and passed around explicitly. The set of labels and
//! their configs are fixed after `initialize`; only the pool slot of each
//! entry is ever written, and only by the resolver.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::connection::ConnectionConfig;
use crate::config::DatabasesConfig;
use crate::error::{ConfigError, Result};

struct ConnectionEntry<P> {
    config: Arc<ConnectionConfig>,
    pool: Option<P>,
}

pub struct Registry<P> {
    default_label: String,
    entries: RwLock<HashMap<String, ConnectionEntry<P>>>,
}

impl<P: Clone> Registry<P> {
    /// Decode every labelled section of `[databases]`.
    ///
    /// Fails if `default` is missing or blank, if it names no configured
    /// section, or if any section is malformed.
    pub fn initialize(config: &DatabasesConfig) -> Result<Self> {
        let default_label = config
            .default_label()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .ok_or(ConfigError::MissingDefault)?
            .to_owned();

        let mut entries = HashMap::new();
        for (label, value) in config.connections() {
            let parsed = ConnectionConfig::from_value(label, value)?;
            tracing::debug!(
                label,
                driver = %parsed.driver,
                connection = %parsed.connection_string(),
                "registered database connection"
            );
            entries.insert(
                label.to_owned(),
                ConnectionEntry {
                    config: Arc::new(parsed),
                    pool: None,
                },
            );
        }

        if !entries.contains_key(&default_label) {
            return Err(ConfigError::UnknownDefault {
                label: default_label,
            });
        }

        tracing::info!(
            default = %default_label,
            connections = entries.len(),
            "database registry initialized"
        );

        Ok(Self {
            default_label,
            entries: RwLock::new(entries),
        })
    }

    pub fn default_label(&self) -> &str {
        &self.default_label
    }

    /// Config and current pool handle for a label.
    pub async fn get(&self, label: &str) -> Option<(Arc<ConnectionConfig>, Option<P>)> {
        let entries = self.entries.read().await;
        entries
            .get(label)
            .map(|entry| (Arc::clone(&entry.config), entry.pool.clone()))
    }

    /// Current pool handle for a label, if one has been stored.
    pub async fn pool(&self, label: &str) -> Option<P> {
        let entries = self.entries.read().await;
        entries.get(label).and_then(|entry| entry.pool.clone())
    }

    /// Store a validated pool for a label, replacing any previous handle.
    /// Returns `false` for an unknown label.
    pub async fn store(&self, label: &str, pool: P) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(label) {
            Some(entry) => {
                entry.pool = Some(pool);
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, label: &str) -> bool {
        self.entries.read().await.contains_key(label)
    }

    /// All configured labels, sorted.
    pub async fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.entries.read().await.keys().cloned().collect();
        labels.sort();
        labels
    }
}
