//! Tracing setup: compact stderr logs, optionally mirrored to OTLP
//!
//! Usage:
//!   products --debug serve             # Debug logging
//!   products --otel serve              # Also export spans (telemetry feature)
//!   RUST_LOG=products_core=debug ...   # Fine-grained log control
//!
//! Environment variables:
//!   RUST_LOG                           # Log filter (default: info)
//!   OTEL_EXPORTER_OTLP_ENDPOINT        # OTLP endpoint (default: http://localhost:4317)
//!   OTEL_SERVICE_NAME                  # Service name (default: products-api)

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Debug level unless RUST_LOG is explicitly set
    pub debug: bool,
    /// Enable OpenTelemetry OTLP export
    pub otel: bool,
}

/// Flushes exported spans when dropped.
#[must_use = "dropping the guard stops span export"]
pub struct TracingGuard {
    otel: bool,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        #[cfg(feature = "telemetry")]
        if self.otel {
            opentelemetry::global::shutdown_tracer_provider();
        }
        #[cfg(not(feature = "telemetry"))]
        let _ = self.otel;
    }
}

fn env_filter(config: &TracingConfig) -> EnvFilter {
    let fallback = if config.debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

#[cfg(feature = "telemetry")]
mod otlp {
    use anyhow::{anyhow, Result};
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::{Tracer, TracerProvider};
    use tracing::Subscriber;
    use tracing_opentelemetry::OpenTelemetryLayer;
    use tracing_subscriber::registry::LookupSpan;

    /// Span layer exporting in batches over OTLP/gRPC.
    pub fn layer<S>() -> Result<OpenTelemetryLayer<S, Tracer>>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:4317".to_string());
        let service_name =
            std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "products-api".to_string());

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()
            .map_err(|e| anyhow!("failed to create OTLP exporter: {e}"))?;

        let provider = TracerProvider::builder()
            .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
            .with_resource(opentelemetry_sdk::Resource::new(vec![KeyValue::new(
                "service.name",
                service_name,
            )]))
            .build();

        let tracer = provider.tracer("products");
        // The global handle keeps the provider (and its exporter) alive
        let _ = opentelemetry::global::set_tracer_provider(provider);

        tracing::debug!(%endpoint, "OTLP span export configured");
        Ok(tracing_opentelemetry::layer().with_tracer(tracer))
    }
}

/// Install the global subscriber. Keep the guard alive until exit.
pub fn init(config: &TracingConfig) -> Result<TracingGuard> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(config.debug)
        .with_writer(std::io::stderr)
        .compact();

    #[cfg(feature = "telemetry")]
    let otel_layer = if config.otel { Some(otlp::layer()?) } else { None };

    #[cfg(not(feature = "telemetry"))]
    let otel_layer: Option<tracing_subscriber::layer::Identity> = {
        if config.otel {
            eprintln!("--otel ignored: built without the `telemetry` feature");
        }
        None
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(TracingGuard { otel: config.otel })
}
