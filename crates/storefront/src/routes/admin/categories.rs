//! Back-office category management (admin only).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use pasteleria_core::CategoriaId;

use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Categoria, CategoriaConConteo, CategoriaInput};
use crate::state::AppState;

fn validate(input: &CategoriaInput) -> Result<()> {
    if input.nombre.trim().is_empty() {
        return Err(AppError::BadRequest("el nombre es obligatorio".to_string()));
    }
    Ok(())
}

/// `GET /api/admin/categories`
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<CategoriaConConteo>>> {
    Ok(Json(
        CategoryRepository::new(state.pool())
            .list_with_counts()
            .await?,
    ))
}

/// `POST /api/admin/categories`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id, nombre = %input.nombre))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CategoriaInput>,
) -> Result<impl IntoResponse> {
    validate(&input)?;
    let categoria = CategoryRepository::new(state.pool()).create(&input).await?;
    state.catalog().invalidate_all().await;
    Ok((StatusCode::CREATED, Json(categoria)))
}

/// `PUT /api/admin/categories/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoriaId>,
    Json(input): Json<CategoriaInput>,
) -> Result<Json<Categoria>> {
    validate(&input)?;
    let categoria = CategoryRepository::new(state.pool())
        .update(id, &input)
        .await?;
    state.catalog().invalidate_all().await;
    Ok(Json(categoria))
}

/// `DELETE /api/admin/categories/{id}`
///
/// Refused with 409 while products still belong to the category.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoriaId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    state.catalog().invalidate_all().await;
    Ok(StatusCode::NO_CONTENT)
}
