//! Back-office product management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use pasteleria_core::PastelId;

use crate::db::products::ProductFilter;
use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireStaff};
use crate::models::{Pastel, PastelInput};
use crate::state::AppState;

/// `GET /api/admin/products`
pub async fn list(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Pastel>>> {
    Ok(Json(
        ProductRepository::new(state.pool())
            .list(&filter.normalized())
            .await?,
    ))
}

/// `GET /api/admin/products/critical`
pub async fn critical(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
) -> Result<Json<Vec<Pastel>>> {
    Ok(Json(ProductRepository::new(state.pool()).critical().await?))
}

/// `POST /api/admin/products`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, nombre = %input.nombre))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<PastelInput>,
) -> Result<impl IntoResponse> {
    validate(&state, &input).await?;
    let pastel = ProductRepository::new(state.pool()).create(&input).await?;
    state.catalog().invalidate_all().await;

    tracing::info!(pastel_id = %pastel.id, "Product created");
    Ok((StatusCode::CREATED, Json(pastel)))
}

/// `PUT /api/admin/products/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<PastelId>,
    Json(input): Json<PastelInput>,
) -> Result<Json<Pastel>> {
    validate(&state, &input).await?;
    let pastel = ProductRepository::new(state.pool())
        .update(id, &input)
        .await?;
    state.catalog().invalidate_all().await;

    tracing::info!(pastel_id = %pastel.id, stock = pastel.stock, "Product updated");
    Ok(Json(pastel))
}

/// `DELETE /api/admin/products/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<PastelId>,
) -> Result<StatusCode> {
    if !ProductRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound("producto no encontrado".to_string()));
    }
    state.catalog().invalidate_all().await;

    tracing::info!(pastel_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Field ranges plus an existing category.
async fn validate(state: &AppState, input: &PastelInput) -> Result<()> {
    input.validate().map_err(AppError::BadRequest)?;

    if let Some(categoria_id) = input.categoria_id
        && CategoryRepository::new(state.pool())
            .get(categoria_id)
            .await?
            .is_none()
    {
        return Err(AppError::BadRequest("la categoría no existe".to_string()));
    }
    Ok(())
}
