//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Request ids and tracing middleware
//! - Trailing-slash normalisation
//! - An optional HTTPS listener next to the plain one
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, ServiceExt};
use axum_server::tls_rustls::RustlsConfig;
use products_core::{AppConfig, ConfigError, Database, TlsConfig};
use tokio::net::TcpListener;
use tower::{Layer, ServiceBuilder};
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::error::ErrorDetail;
use super::routes;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3030)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,

    /// Deadline for each request's database work
    pub request_timeout: Duration,

    /// Hide internal error detail from responses
    pub production: bool,

    /// HTTPS listener, served alongside `bind_addr` when set
    pub tls: Option<TlsSettings>,
}

/// Address and PEM files for the HTTPS listener
#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub bind_addr: SocketAddr,
    pub certificate: PathBuf,
    pub key: PathBuf,
}

impl TlsSettings {
    /// `None` when `[app.service.tls]` is disabled.
    pub fn from_config(tls: &TlsConfig) -> Result<Option<Self>, ConfigError> {
        if !tls.enabled {
            return Ok(None);
        }
        tls.validate()?;
        Ok(Some(Self {
            bind_addr: tls.bind_addr()?,
            certificate: tls.certificate.clone(),
            key: tls.key.clone(),
        }))
    }

    async fn load(&self) -> Result<RustlsConfig, ServerError> {
        // Errs only when a provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();
        RustlsConfig::from_pem_file(&self.certificate, &self.key)
            .await
            .map_err(|source| ServerError::Tls {
                certificate: self.certificate.clone(),
                source,
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
            request_timeout: Duration::from_secs(10),
            production: false,
            tls: None,
        }
    }
}

impl ServerConfig {
    /// Server settings from `[app]` / `[app.service]`.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let service = &config.app.service;
        Ok(Self {
            bind_addr: service.bind_addr()?,
            cors_permissive: service.cors_permissive,
            request_timeout: service.request_timeout()?,
            production: config.is_production(),
            tls: TlsSettings::from_config(&service.tls)?,
        })
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub request_timeout: Duration,
    pub production: bool,
}

fn cors_layer(permissive: bool) -> CorsLayer {
    if permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        return CorsLayer::permissive();
    }

    // Localhost only
    CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:3030"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://127.0.0.1:3030"),
        ])
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Re-render error bodies with the request id, plus the underlying cause
/// outside production.
async fn finish_error_body(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let response = next.run(request).await;
    let Some(ErrorDetail(mut body)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    if state.production {
        body.debug = None;
    }
    body.request_id = request_id;
    (response.status(), Json(body)).into_response()
}

/// Build the application: routes, middleware, and trailing-slash trimming.
pub fn build_app(state: Arc<AppState>, cors_permissive: bool) -> NormalizePath<Router> {
    let router = Router::new()
        .merge(routes::health::router())
        .merge(routes::products::router())
        .merge(routes::options::router())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            finish_error_body,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer(cors_permissive)),
        )
        .with_state(state);

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// Run the HTTP server (and the HTTPS one, if configured) until Ctrl+C or
/// SIGTERM.
///
/// # Example
///
/// ```ignore
/// let db = Database::connect(&config.databases)?;
/// run_server(db, ServerConfig::from_app_config(&config)?).await?;
/// ```
pub async fn run_server(db: Database, config: ServerConfig) -> Result<(), ServerError> {
    let state = Arc::new(AppState {
        db,
        request_timeout: config.request_timeout,
        production: config.production,
    });
    let app = build_app(state, config.cors_permissive);

    // Certificates are read before anything binds
    let tls = match &config.tls {
        Some(settings) => Some((settings.bind_addr, settings.load().await?)),
        None => None,
    };

    // Bind listener
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        request_timeout = ?config.request_timeout,
        "Server listening"
    );

    let tls_handle = axum_server::Handle::new();
    let shutdown = {
        let tls_handle = tls_handle.clone();
        async move {
            shutdown_signal().await;
            tls_handle.graceful_shutdown(None);
        }
    };

    // Run with graceful shutdown
    let plain_service = ServiceExt::<Request>::into_make_service(app.clone());
    let plain = async {
        axum::serve(listener, plain_service)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::from)
    };

    match tls {
        Some((addr, rustls_config)) => {
            tracing::info!(%addr, "TLS listener enabled");
            let secure = async {
                axum_server::bind_rustls(addr, rustls_config)
                    .handle(tls_handle)
                    .serve(ServiceExt::<Request>::into_make_service(app))
                    .await
                    .map_err(ServerError::from)
            };
            tokio::try_join!(plain, secure)?;
        }
        None => plain.await?,
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to load TLS certificate {certificate:?} or its key: {source}")]
    Tls {
        certificate: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
