//! Connectivity check: resolve every configured database label once.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use products_core::{Context as DbContext, Database};

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Config file (default: $PRODUCTS_CONFIG, then config/products.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

/// Print `label: ok` or `label: <error>` per connection; fail if any failed.
pub async fn run_check(args: CheckArgs) -> Result<()> {
    let config = super::load_config(args.config)?;
    let db = Database::connect(&config.databases).context("invalid database configuration")?;

    let results = db.check(&DbContext::background()).await;
    let total = results.len();
    let mut failed = 0;

    for (label, outcome) in results {
        match outcome {
            Ok(()) => println!("{label}: ok"),
            Err(e) => {
                failed += 1;
                println!("{label}: {e}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {total} database connections failed");
    }
    Ok(())
}
