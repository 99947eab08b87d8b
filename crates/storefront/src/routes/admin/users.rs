//! Back-office account management (admin only).
//!
//! An admin cannot delete their own account or drop their own admin role.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use pasteleria_core::{Role, UsuarioId};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Usuario, UsuarioChanges};
use crate::services::{AuthService, Registro};
use crate::state::AppState;

/// `POST /api/admin/users` body.
#[derive(Debug, Deserialize)]
pub struct NewAccount {
    #[serde(flatten)]
    pub registro: Registro,
    #[serde(default)]
    pub role: Role,
}

/// `PUT /api/admin/users/{id}` body. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct AccountUpdate {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub direccion: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

/// `GET /api/admin/users`
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<Usuario>>> {
    Ok(Json(UserRepository::new(state.pool()).list().await?))
}

/// `GET /api/admin/users/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<UsuarioId>,
) -> Result<Json<Usuario>> {
    UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// `POST /api/admin/users`
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, role = %body.role))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<NewAccount>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool())
        .register(&body.registro, body.role)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `PUT /api/admin/users/{id}`
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UsuarioId>,
    Json(body): Json<AccountUpdate>,
) -> Result<Json<Usuario>> {
    if id == admin.id && body.role.is_some_and(|role| role != Role::Admin) {
        return Err(AppError::BadRequest(
            "no puedes quitarte el rol de administrador".to_string(),
        ));
    }

    let changes = UsuarioChanges {
        nombre: non_blank("nombre", body.nombre)?,
        apellido: non_blank("apellido", body.apellido)?,
        direccion: body.direccion.map(|v| v.trim().to_string()),
        imagen: None,
        role: body.role,
    };

    let users = UserRepository::new(state.pool());
    if users.get_by_id(id).await?.is_none() {
        return Err(not_found());
    }
    if let Some(password) = &body.password {
        AuthService::new(state.pool())
            .set_password(id, password)
            .await?;
    }

    let user = users.update(id, &changes).await?.ok_or_else(not_found)?;
    tracing::info!(usuario_id = %user.id, role = %user.role, "Account updated");
    Ok(Json(user))
}

/// `DELETE /api/admin/users/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UsuarioId>,
) -> Result<StatusCode> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "no puedes eliminar tu propia cuenta".to_string(),
        ));
    }

    if !UserRepository::new(state.pool()).delete(id).await? {
        return Err(not_found());
    }
    tracing::info!(usuario_id = %id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn not_found() -> AppError {
    AppError::NotFound("usuario no encontrado".to_string())
}

fn non_blank(field: &str, value: Option<String>) -> Result<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(AppError::BadRequest(format!(
            "el {field} no puede quedar vacío"
        ))),
        other => Ok(other.map(|v| v.trim().to_string())),
    }
}
