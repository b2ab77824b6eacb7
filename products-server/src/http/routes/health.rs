//! Health check endpoint
//!
//! `status` is process liveness and is always `ok`; `database` reports
//! whether the read-write pool resolved within a short deadline.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use products_core::Context;
use serde::Serialize;

use crate::http::AppState;

const DATABASE_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ctx = Context::background().with_timeout(DATABASE_PROBE_TIMEOUT);
    let database = match state.db.rw(&ctx).await {
        Ok(_) => "up",
        Err(e) => {
            tracing::warn!(error = %e, "health probe could not reach database");
            "down"
        }
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
