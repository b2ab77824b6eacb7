//! Product endpoints
//!
//! - GET    /api/products?name=  - list, optionally filtered by name
//! - GET    /api/products/{id}   - fetch one
//! - POST   /api/products        - create, returns the new id
//! - PUT    /api/products/{id}   - replace fields, returns the id
//! - DELETE /api/products/{id}   - delete product and its options

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::ProductRepo;
use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ProductId, RequestContext};
use crate::http::AppState;
use crate::models::{Items, Product};

/// Query parameters for listing
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub name: Option<String>,
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    Query(params): Query<ListParams>,
) -> Result<Json<Items<Product>>, ApiError> {
    let products = ProductRepo::new(&state.db)
        .list(&ctx, params.name.as_deref())
        .await?;
    Ok(Json(products.into()))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    ProductId(id): ProductId,
) -> Result<Json<Product>, ApiError> {
    let product = ProductRepo::new(&state.db).get(&ctx, id).await?;
    Ok(Json(product))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    JsonBody(product): JsonBody<Product>,
) -> Result<(StatusCode, Json<String>), ApiError> {
    product.validate()?;
    let id = ProductRepo::new(&state.db).create(&ctx, &product).await?;
    Ok((StatusCode::CREATED, Json(id.to_string())))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    ProductId(id): ProductId,
    JsonBody(product): JsonBody<Product>,
) -> Result<Json<String>, ApiError> {
    product.validate()?;
    let updated = ProductRepo::new(&state.db).update(&ctx, id, &product).await?;
    if updated == 0 {
        return Err(ApiError::NotFound {
            resource: "product",
            id: id.to_string(),
        });
    }
    Ok(Json(id.to_string()))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    RequestContext(ctx): RequestContext,
    ProductId(id): ProductId,
) -> Result<Json<String>, ApiError> {
    let deleted = ProductRepo::new(&state.db).delete(&ctx, id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound {
            resource: "product",
            id: id.to_string(),
        });
    }
    Ok(Json(id.to_string()))
}

/// Product routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}
