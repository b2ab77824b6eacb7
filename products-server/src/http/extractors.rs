//! Custom Axum extractors

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;
use products_core::Context;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::error::ApiError;
use super::server::AppState;
use crate::models::ValidationError;

/// Look up a path parameter and parse it as a UUID.
async fn path_uuid<S>(parts: &mut Parts, state: &S, field: &'static str) -> Result<Uuid, ApiError>
where
    S: Send + Sync,
{
    let Path(params): Path<HashMap<String, String>> = Path::from_request_parts(parts, state)
        .await
        .map_err(|_| ApiError::Validation(ValidationError::Empty { field }))?;

    let raw = params
        .get(field)
        .ok_or(ApiError::Validation(ValidationError::Empty { field }))?;

    Uuid::parse_str(raw).map_err(|_| {
        ApiError::Validation(ValidationError::InvalidFormat {
            field,
            reason: "invalid UUID format",
        })
    })
}

/// `{id}` path segment as a product UUID
pub struct ProductId(pub Uuid);

impl<S> FromRequestParts<S> for ProductId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(path_uuid(parts, state, "id").await?))
    }
}

/// `{id}` and `{option_id}` path segments
pub struct OptionIds {
    pub product: Uuid,
    pub option: Uuid,
}

impl<S> FromRequestParts<S> for OptionIds
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            product: path_uuid(parts, state, "id").await?,
            option: path_uuid(parts, state, "option_id").await?,
        })
    }
}

/// Per-request database context bounded by the configured request timeout.
///
/// Dropping the handler future drops every query and retry loop awaiting
/// this context with it.
pub struct RequestContext(pub Context);

impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(Context::background().with_timeout(state.request_timeout)))
    }
}

/// JSON body whose decode failures use the API error envelope.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest {
                message: rejection.body_text(),
            })?;
        Ok(Self(value))
    }
}
