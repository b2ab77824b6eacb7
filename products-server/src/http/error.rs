//! API error types with IntoResponse
//!
//! Errors become a JSON envelope:
//! `{"status": "failed"|"retry", "error": "errors.<code>", "message": ...}`.
//! `retry` marks failures a client may reasonably repeat.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use products_core::ResolveError;
use serde::Serialize;

use crate::db::repos::DbError;
use crate::models::ValidationError;

/// Whether a client should repeat the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Failed,
    Retry,
}

/// Error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub status: Classification,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
    /// Copied from the request's `x-request-id` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Full error body attached to every error response as an extension.
/// The `debug` field is only surfaced outside production.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub ErrorBody);

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Request body could not be decoded (400)
    BadRequest { message: String },

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// No usable database connection (503, or 500 when misconfigured)
    Unavailable(ResolveError),

    /// Request deadline passed or the request was abandoned (503)
    Cancelled { reason: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500)
    Internal { message: String },
}

impl ApiError {
    fn parts(&self) -> (StatusCode, Classification, &'static str, String) {
        use Classification::{Failed, Retry};

        match self {
            Self::Validation(e) => {
                (StatusCode::BAD_REQUEST, Failed, "invalid_request", e.to_string())
            }
            Self::BadRequest { message } => {
                (StatusCode::BAD_REQUEST, Failed, "invalid_request", message.clone())
            }
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                Failed,
                unavailable_code(resource),
                format!("{} '{}' not found", resource, id),
            ),
            Self::Unavailable(ResolveError::UnknownLabel { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Failed,
                "database_misconfigured",
                "database connection is not configured".to_string(),
            ),
            Self::Unavailable(ResolveError::Cancelled { .. }) | Self::Cancelled { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Retry,
                "request_cancelled",
                "request did not complete in time".to_string(),
            ),
            Self::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Retry,
                "database_unavailable",
                "database is temporarily unavailable".to_string(),
            ),
            Self::Database(_) | Self::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Retry,
                "unexpected_error",
                "an internal error occurred".to_string(),
            ),
        }
    }

    /// Underlying cause for server-side failures.
    fn detail(&self) -> Option<String> {
        match self {
            Self::Unavailable(e) => Some(e.to_string()),
            Self::Cancelled { reason } => Some(reason.clone()),
            Self::Database(e) => Some(e.to_string()),
            Self::Internal { message } => Some(message.clone()),
            _ => None,
        }
    }
}

fn unavailable_code(resource: &str) -> &'static str {
    match resource {
        "product" => "product_unavailable",
        "product_option" => "product_option_unavailable",
        _ => "resource_unavailable",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, classification, code, message) = self.parts();
        let detail = self.detail();

        // Log the actual error, return generic message
        if let Some(detail) = detail.as_ref().filter(|_| status.is_server_error()) {
            tracing::error!(code, "{}", detail);
        }

        let body = ErrorBody {
            status: classification,
            error: format!("errors.{}", code),
            message,
            debug: None,
            request_id: None,
        };

        let mut response = (status, Json(&body)).into_response();
        response.extensions_mut().insert(ErrorDetail(ErrorBody {
            debug: detail,
            ..body
        }));
        response
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        Self::Unavailable(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Unavailable(e) => Self::Unavailable(e),
            DbError::Cancelled(reason) => Self::Cancelled {
                reason: reason.to_string(),
            },
            _ => Self::Database(e),
        }
    }
}
