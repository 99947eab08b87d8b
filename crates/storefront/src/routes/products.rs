//! Catalog route handlers.
//!
//! Reads go through the catalog cache; admin writes invalidate it.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use pasteleria_core::PastelId;

use crate::db::ProductRepository;
use crate::db::products::ProductFilter;
use crate::error::{AppError, Result};
use crate::models::{CategoriaConConteo, Pastel};
use crate::state::AppState;

/// `GET /api/products?categoria=<slug>&q=<text>`
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Arc<Vec<Pastel>>>> {
    let products = state
        .catalog()
        .products(state.pool(), filter.normalized())
        .await?;
    Ok(Json(products))
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<PastelId>,
) -> Result<Json<Pastel>> {
    state
        .catalog()
        .product(state.pool(), id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("producto no encontrado".to_string()))
}

/// `GET /api/products/slug/{slug}`
#[instrument(skip(state))]
pub async fn show_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Pastel>> {
    ProductRepository::new(state.pool())
        .get_by_slug(&slug.to_lowercase())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("producto no encontrado".to_string()))
}

/// `GET /api/categories`
pub async fn categories(State(state): State<AppState>) -> Result<Json<Arc<Vec<CategoriaConConteo>>>> {
    Ok(Json(state.catalog().categories(state.pool()).await?))
}
