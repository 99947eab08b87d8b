//! Authentication service.
//!
//! Password registration and login backed by Argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::instrument;

use pasteleria_core::{Email, Role, UsuarioId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::{NuevoUsuario, Usuario};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration payload, as submitted by the sign-up form.
#[derive(Debug, Clone, Deserialize)]
pub struct Registro {
    pub nombre: String,
    pub apellido: String,
    pub correo: String,
    pub password: String,
    #[serde(default)]
    pub fecha_nacimiento: Option<NaiveDate>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub imagen: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new account with the given role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidInput` for blank names or a future birth date.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, registro), fields(correo = %registro.correo))]
    pub async fn register(&self, registro: &Registro, role: Role) -> Result<Usuario, AuthError> {
        let nuevo = validate_registro(registro, role, Utc::now().date_naive())?;
        validate_password(&registro.password)?;
        let password_hash = hash_password(&registro.password)?;

        let user = self
            .users
            .create(&nuevo, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(usuario_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, correo: &str, password: &str) -> Result<Usuario, AuthError> {
        let correo = Email::parse(correo).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&correo)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Replace a user's password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet
    /// requirements, or `AuthError::Repository(NotFound)` for an unknown user.
    #[instrument(skip(self, password))]
    pub async fn set_password(&self, id: UsuarioId, password: &str) -> Result<(), AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        self.users.set_password_hash(id, &password_hash).await?;
        tracing::info!(usuario_id = %id, "Password changed");
        Ok(())
    }
}

fn validate_registro(registro: &Registro, role: Role, today: NaiveDate) -> Result<NuevoUsuario, AuthError> {
    let nombre = registro.nombre.trim();
    let apellido = registro.apellido.trim();
    if nombre.is_empty() {
        return Err(AuthError::InvalidInput("el nombre es obligatorio".to_string()));
    }
    if apellido.is_empty() {
        return Err(AuthError::InvalidInput("el apellido es obligatorio".to_string()));
    }
    if registro.fecha_nacimiento.is_some_and(|fecha| fecha > today) {
        return Err(AuthError::InvalidInput(
            "la fecha de nacimiento no puede ser futura".to_string(),
        ));
    }

    let optional = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    };

    Ok(NuevoUsuario {
        nombre: nombre.to_string(),
        apellido: apellido.to_string(),
        correo: Email::parse(&registro.correo)?,
        role,
        fecha_nacimiento: registro.fecha_nacimiento,
        direccion: optional(&registro.direccion),
        imagen: optional(&registro.imagen),
    })
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "la contraseña debe tener al menos {MIN_PASSWORD_LENGTH} caracteres"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn registro(correo: &str, password: &str) -> Registro {
        Registro {
            nombre: "María".to_string(),
            apellido: "González".to_string(),
            correo: correo.to_string(),
            password: password.to_string(),
            fecha_nacimiento: NaiveDate::from_ymd_opt(1990, 5, 17),
            direccion: Some("  ".to_string()),
            imagen: None,
        }
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("milsabores").unwrap();
        assert!(verify_password("milsabores", &hash).is_ok());
        assert!(matches!(
            verify_password("milsabore", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_registration_validation() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let nuevo = validate_registro(&registro(" Maria@Duoc.CL ", "x"), Role::User, today).unwrap();
        assert_eq!(nuevo.correo.as_str(), "maria@duoc.cl");
        assert_eq!(nuevo.direccion, None);

        let mut future = registro("maria@duoc.cl", "x");
        future.fecha_nacimiento = NaiveDate::from_ymd_opt(2025, 3, 2);
        assert!(matches!(
            validate_registro(&future, Role::User, today),
            Err(AuthError::InvalidInput(_))
        ));

        let mut blank = registro("maria@duoc.cl", "x");
        blank.apellido = " ".to_string();
        assert!(matches!(
            validate_registro(&blank, Role::User, today),
            Err(AuthError::InvalidInput(_))
        ));

        assert!(matches!(
            validate_registro(&registro("maria", "x"), Role::User, today),
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let pool = memory_pool().await.unwrap();
        let auth = AuthService::new(&pool);

        assert!(matches!(
            auth.register(&registro("maria@duoc.cl", "corta"), Role::User).await,
            Err(AuthError::WeakPassword(_))
        ));

        let user = auth
            .register(&registro("maria@duoc.cl", "milsabores"), Role::User)
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);

        assert!(matches!(
            auth.register(&registro("MARIA@duoc.cl", "milsabores"), Role::User).await,
            Err(AuthError::UserAlreadyExists)
        ));

        let logged_in = auth.login("Maria@duoc.cl", "milsabores").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("maria@duoc.cl", "incorrecta").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nadie@duoc.cl", "milsabores").await,
            Err(AuthError::InvalidCredentials)
        ));

        assert!(matches!(
            auth.set_password(user.id, "corta").await,
            Err(AuthError::WeakPassword(_))
        ));
        auth.set_password(user.id, "tortadelimon").await.unwrap();
        assert!(auth.login("maria@duoc.cl", "milsabores").await.is_err());
        assert!(auth.login("maria@duoc.cl", "tortadelimon").await.is_ok());
    }
}
