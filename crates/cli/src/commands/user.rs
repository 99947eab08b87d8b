//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Back-office administrator
//! pasteleria-cli user create -c admin@duoc.cl -n Ana -a Rojas -r admin --password '...'
//!
//! # Read-only staff account, password from the environment
//! PASTELERIA_PASSWORD='...' pasteleria-cli user create -c ventas@duoc.cl -n Luis -a Soto -r vendedor
//! ```

use std::path::Path;

use pasteleria_core::{Role, UsuarioId};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use pasteleria_storefront::db::{self, DatabaseError};
use pasteleria_storefront::services::{AuthError, AuthService, Registro};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: user, vendedor, admin")]
    InvalidRole(String),

    /// Database could not be opened.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Registration rejected.
    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Account details collected from the command line.
pub struct NewAccount {
    pub correo: String,
    pub nombre: String,
    pub apellido: String,
    pub role: String,
    pub password: SecretString,
}

/// Create a new account with the requested role.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `UserError` for an unknown role, a missing database or a rejected
/// registration (invalid email, weak password, duplicate account).
pub async fn create(database: &Path, account: &NewAccount) -> Result<UsuarioId, UserError> {
    let role =
        Role::from_name(&account.role).ok_or_else(|| UserError::InvalidRole(account.role.clone()))?;

    let pool = db::open(database, false).await?;

    tracing::info!("Creating account: {} ({})", account.correo, role);
    let registro = Registro {
        nombre: account.nombre.clone(),
        apellido: account.apellido.clone(),
        correo: account.correo.clone(),
        password: account.password.expose_secret().to_owned(),
        fecha_nacimiento: None,
        direccion: None,
        imagen: None,
    };
    let user = AuthService::new(&pool).register(&registro, role).await?;
    pool.close().await;

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.correo,
        user.role
    );
    Ok(user.id)
}
