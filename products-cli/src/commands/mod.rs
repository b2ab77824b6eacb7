//! Command implementations for the products CLI

pub mod check;
pub mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use products_core::AppConfig;

pub use check::run_check;
pub use serve::run_serve;

/// Load config from `--config`, `PRODUCTS_CONFIG`, or the default path.
fn load_config(explicit: Option<PathBuf>) -> Result<AppConfig> {
    let path = AppConfig::resolve_path(explicit);
    tracing::debug!(path = %path.display(), "loading config");
    AppConfig::load(&path).with_context(|| format!("failed to load config from {}", path.display()))
}
