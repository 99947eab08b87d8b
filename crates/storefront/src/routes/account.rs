//! Account route handlers.
//!
//! These routes require authentication.

use axum::{Json, extract::State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::{OrderRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{CurrentUser, PedidoConItems, Usuario, UsuarioChanges};
use crate::state::AppState;

/// `PUT /api/account` body. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub direccion: Option<String>,
    pub imagen: Option<String>,
}

impl ProfileUpdate {
    fn into_changes(self) -> Result<UsuarioChanges> {
        let required = |field: &str, value: Option<String>| match value {
            Some(v) if v.trim().is_empty() => Err(AppError::BadRequest(format!(
                "el {field} no puede quedar vacío"
            ))),
            other => Ok(other.map(|v| v.trim().to_string())),
        };

        Ok(UsuarioChanges {
            nombre: required("nombre", self.nombre)?,
            apellido: required("apellido", self.apellido)?,
            direccion: self.direccion.map(|v| v.trim().to_string()),
            imagen: self.imagen.map(|v| v.trim().to_string()),
            role: None,
        })
    }
}

/// `PUT /api/account`
#[instrument(skip(state, session, current, body), fields(usuario_id = %current.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<Usuario>> {
    let changes = body.into_changes()?;
    let user = UserRepository::new(state.pool())
        .update(current.id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("usuario no encontrado".to_string()))?;

    // Keep the session's display name in step with the profile.
    set_current_user(&session, &CurrentUser::from(&user)).await?;
    Ok(Json(user))
}

/// `GET /api/account/orders`
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Vec<PedidoConItems>>> {
    Ok(Json(
        OrderRepository::new(state.pool())
            .list_for_user(current.id)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_names_are_rejected() {
        let update = ProfileUpdate {
            nombre: Some("  ".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(matches!(update.into_changes(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_values_are_trimmed() {
        let update = ProfileUpdate {
            apellido: Some(" Pérez ".to_string()),
            direccion: Some(" Av. Siempre Viva 742 ".to_string()),
            ..ProfileUpdate::default()
        };
        let changes = update.into_changes().unwrap_or_default();
        assert_eq!(changes.apellido.as_deref(), Some("Pérez"));
        assert_eq!(changes.direccion.as_deref(), Some("Av. Siempre Viva 742"));
        assert_eq!(changes.nombre, None);
    }
}
