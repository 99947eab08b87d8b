//! User (usuario) domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use pasteleria_core::{Email, Role, UsuarioId};

/// A storefront account.
///
/// The password hash is deliberately not part of this type.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Usuario {
    pub id: UsuarioId,
    pub nombre: String,
    pub apellido: String,
    pub correo: Email,
    pub role: Role,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub direccion: Option<String>,
    pub imagen: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Usuario {
    /// "Nombre Apellido".
    #[must_use]
    pub fn nombre_completo(&self) -> String {
        format!("{} {}", self.nombre, self.apellido)
    }
}

/// Validated data for a new account.
#[derive(Debug, Clone)]
pub struct NuevoUsuario {
    pub nombre: String,
    pub apellido: String,
    pub correo: Email,
    pub role: Role,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub direccion: Option<String>,
    pub imagen: Option<String>,
}

/// Partial update of an account. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UsuarioChanges {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub direccion: Option<String>,
    pub imagen: Option<String>,
    pub role: Option<Role>,
}
