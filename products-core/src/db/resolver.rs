//! Pool resolver: label → live, pinged pool
//!
//! Per call: pick the label (explicit or default), reuse the registry's pool
//! or open a new one, ping it under the caller's context, and retry the whole
//! step under the backoff policy. A freshly created pool is stored only after
//! its first successful ping.
//!
//! Creation is not serialised per label. Two callers may both open a pool
//! for the same label; the later store wins and the other pool is dropped.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::connection::ConnectionConfig;
use super::connector::Connector;
use super::context::{Context, DoneReason};
use super::registry::Registry;
use super::retry::{BackoffPolicy, RetryError};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no database connection configured for label '{label}'")]
    UnknownLabel { label: String },

    #[error("database '{label}' unavailable after {attempts} attempts in {elapsed:?}: {source}")]
    Exhausted {
        label: String,
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: BoxError,
    },

    #[error("resolving database '{label}' aborted: {reason}")]
    Cancelled { label: String, reason: DoneReason },
}

impl ResolveError {
    /// Whether a caller may reasonably try again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::Cancelled { .. })
    }
}

pub struct PoolResolver<C: Connector> {
    registry: Arc<Registry<C::Pool>>,
    connector: Arc<C>,
    policy: BackoffPolicy,
}

impl<C: Connector> Clone for PoolResolver<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            connector: Arc::clone(&self.connector),
            policy: self.policy,
        }
    }
}

impl<C: Connector> PoolResolver<C> {
    pub fn new(registry: Arc<Registry<C::Pool>>, connector: C) -> Self {
        Self {
            registry,
            connector: Arc::new(connector),
            policy: BackoffPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &Registry<C::Pool> {
        &self.registry
    }

    /// Return a pool for `label` (or the default label) that has just passed
    /// a liveness check.
    pub async fn resolve(
        &self,
        ctx: &Context,
        label: Option<&str>,
    ) -> Result<C::Pool, ResolveError> {
        let label = label.unwrap_or_else(|| self.registry.default_label());

        let Some((config, _)) = self.registry.get(label).await else {
            return Err(ResolveError::UnknownLabel {
                label: label.to_owned(),
            });
        };

        let this = self;
        let config: &ConnectionConfig = &config;
        let outcome = self
            .policy
            .retry(ctx, move |attempt| this.attempt(label, config, attempt))
            .await;

        match outcome {
            Ok(pool) => Ok(pool),
            Err(RetryError::Exhausted {
                attempts,
                elapsed,
                last,
            }) => {
                tracing::error!(
                    label,
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %last,
                    "database unavailable, giving up"
                );
                Err(ResolveError::Exhausted {
                    label: label.to_owned(),
                    attempts,
                    elapsed,
                    source: Box::new(last),
                })
            }
            Err(RetryError::Cancelled { attempts }) => {
                let reason = ctx.done_reason().unwrap_or(DoneReason::Cancelled);
                tracing::warn!(label, attempts, %reason, "database resolution aborted");
                Err(ResolveError::Cancelled {
                    label: label.to_owned(),
                    reason,
                })
            }
        }
    }

    async fn attempt(
        &self,
        label: &str,
        config: &ConnectionConfig,
        attempt: u32,
    ) -> Result<C::Pool, C::Error> {
        let (pool, fresh) = match self.registry.pool(label).await {
            Some(pool) => (pool, false),
            None => (self.connector.open(label, config).await?, true),
        };

        if let Err(err) = self.connector.ping(&pool).await {
            tracing::warn!(label, attempt, fresh, error = %err, "database ping failed");
            return Err(err);
        }

        if fresh {
            self.registry.store(label, pool.clone()).await;
            tracing::info!(label, attempt, "database pool ready");
        }

        Ok(pool)
    }
}
