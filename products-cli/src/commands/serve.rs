//! HTTP server command
//!
//! Loads config, builds the connection registry, bootstraps the schema and
//! serves until Ctrl+C / SIGTERM. Any failure before the listener is up is
//! fatal.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use products_core::{Context as DbContext, Database};
use products_server::{bootstrap, run_server, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Config file (default: $PRODUCTS_CONFIG, then config/products.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Address to bind to, overriding [app.service] host/port
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = super::load_config(args.config)?;

    let mut server =
        ServerConfig::from_app_config(&config).context("invalid [app.service] settings")?;
    if let Some(bind) = args.bind {
        server.bind_addr = bind;
    }
    server.cors_permissive |= args.cors_permissive;

    let db = Database::connect(&config.databases).context("invalid database configuration")?;

    bootstrap(&db, &DbContext::background())
        .await
        .context("failed to bootstrap product schema")?;

    tracing::info!("Starting products API on {}", server.bind_addr);

    // Run server (blocks until shutdown)
    run_server(db, server).await.context("Server error")?;

    Ok(())
}
