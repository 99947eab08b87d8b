//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use pasteleria_core::{Email, Role, UsuarioId};

use super::Usuario;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UsuarioId,
    /// User's email address.
    pub correo: Email,
    /// Display name.
    pub nombre: String,
    /// Role as last read from the database.
    pub role: Role,
}

impl From<&Usuario> for CurrentUser {
    fn from(user: &Usuario) -> Self {
        Self {
            id: user.id,
            correo: user.correo.clone(),
            nombre: user.nombre.clone(),
            role: user.role,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for storing a guest's cart ID.
    pub const CART_ID: &str = "cart_id";
}
