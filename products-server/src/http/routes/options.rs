//! Product option endpoints, nested under a product
//!
//! Every handler first checks that the product exists, so an unknown
//! product is a 404 even when the option table has nothing to say.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use products_core::Context;
use uuid::Uuid;

use crate::db::{OptionRepo, ProductRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, OptionIds, ProductId, RequestContext};
use crate::http::AppState;
use crate::models::{Items, ProductOption};

async fn ensure_product(state: &AppState, ctx: &Context, id: Uuid) -> Result<(), ApiError> {
    ProductRepo::new(&state.db).get(ctx, id).await?;
    Ok(())
}

fn option_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound {
        resource: "product_option",
        id: id.to_string(),
    }
}

async fn list_options(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    ProductId(product): ProductId,
) -> Result<Json<Items<ProductOption>>, ApiError> {
    ensure_product(&state, &ctx, product).await?;
    let options = OptionRepo::new(&state.db).list(&ctx, product).await?;
    Ok(Json(options.into()))
}

async fn get_option(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    ids: OptionIds,
) -> Result<Json<ProductOption>, ApiError> {
    ensure_product(&state, &ctx, ids.product).await?;
    let option = OptionRepo::new(&state.db)
        .get(&ctx, ids.product, ids.option)
        .await?;
    Ok(Json(option))
}

async fn create_option(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    ProductId(product): ProductId,
    JsonBody(option): JsonBody<ProductOption>,
) -> Result<(StatusCode, Json<String>), ApiError> {
    option.validate()?;
    ensure_product(&state, &ctx, product).await?;
    let id = OptionRepo::new(&state.db).create(&ctx, product, &option).await?;
    Ok((StatusCode::CREATED, Json(id.to_string())))
}

async fn update_option(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    ids: OptionIds,
    JsonBody(option): JsonBody<ProductOption>,
) -> Result<Json<String>, ApiError> {
    option.validate()?;
    ensure_product(&state, &ctx, ids.product).await?;
    let updated = OptionRepo::new(&state.db)
        .update(&ctx, ids.product, ids.option, &option)
        .await?;
    if updated == 0 {
        return Err(option_not_found(ids.option));
    }
    Ok(Json(ids.option.to_string()))
}

async fn delete_option(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    ids: OptionIds,
) -> Result<Json<String>, ApiError> {
    ensure_product(&state, &ctx, ids.product).await?;
    let deleted = OptionRepo::new(&state.db)
        .delete(&ctx, ids.product, ids.option)
        .await?;
    if deleted == 0 {
        return Err(option_not_found(ids.option));
    }
    Ok(Json(ids.option.to_string()))
}

/// Product option routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/products/{id}/options",
            get(list_options).post(create_option),
        )
        .route(
            "/api/products/{id}/options/{option_id}",
            get(get_option).put(update_option).delete(delete_option),
        )
}
