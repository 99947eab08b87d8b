//! User repository for database operations.
//!
//! Queries use runtime-checked `sqlx::query_as` with `FromRow` models so the
//! crate builds without a live database.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::instrument;

use pasteleria_core::{Email, Role, UsuarioId};

use super::RepositoryError;
use crate::models::{NuevoUsuario, Usuario, UsuarioChanges};

const SELECT_USUARIO: &str = "SELECT id, nombre, apellido, correo, role, fecha_nacimiento, \
     direccion, imagen, created_at, updated_at FROM usuarios";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UsuarioId) -> Result<Option<Usuario>, RepositoryError> {
        let user = sqlx::query_as::<_, Usuario>(&format!("{SELECT_USUARIO} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, correo: &Email) -> Result<Option<Usuario>, RepositoryError> {
        let user = sqlx::query_as::<_, Usuario>(&format!("{SELECT_USUARIO} WHERE correo = ?"))
            .bind(correo)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user and their password hash by email (for login).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        correo: &Email,
    ) -> Result<Option<(Usuario, String)>, RepositoryError> {
        let hash: Option<(UsuarioId, String)> =
            sqlx::query_as("SELECT id, password_hash FROM usuarios WHERE correo = ?")
                .bind(correo)
                .fetch_optional(self.pool)
                .await?;

        let Some((id, password_hash)) = hash else {
            return Ok(None);
        };

        let user = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        Ok(Some((user, password_hash)))
    }

    /// List all users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Usuario>, RepositoryError> {
        let users = sqlx::query_as::<_, Usuario>(&format!("{SELECT_USUARIO} ORDER BY id DESC"))
            .fetch_all(self.pool)
            .await?;
        Ok(users)
    }

    /// Create a new user with a password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, new, password_hash), fields(correo = %new.correo))]
    pub async fn create(
        &self,
        new: &NuevoUsuario,
        password_hash: &str,
    ) -> Result<Usuario, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO usuarios
                (nombre, apellido, correo, password_hash, role, fecha_nacimiento,
                 direccion, imagen, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&new.nombre)
        .bind(&new.apellido)
        .bind(&new.correo)
        .bind(password_hash)
        .bind(new.role)
        .bind(new.fecha_nacimiento)
        .bind(&new.direccion)
        .bind(&new.imagen)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "ya existe una cuenta con ese correo"))?;

        let id = UsuarioId::new(result.last_insert_rowid());
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// Returns `None` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: UsuarioId,
        changes: &UsuarioChanges,
    ) -> Result<Option<Usuario>, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE usuarios SET
                nombre     = COALESCE(?, nombre),
                apellido   = COALESCE(?, apellido),
                direccion  = COALESCE(?, direccion),
                imagen     = COALESCE(?, imagen),
                role       = COALESCE(?, role),
                updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(&changes.nombre)
        .bind(&changes.apellido)
        .bind(&changes.direccion)
        .bind(&changes.imagen)
        .bind(changes.role)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password_hash(
        &self,
        id: UsuarioId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE usuarios SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a user. Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UsuarioId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM usuarios WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count users, optionally restricted to one role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, role: Option<Role>) -> Result<i64, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM usuarios WHERE (?1 IS NULL OR role = ?1)")
                .bind(role)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn nuevo(correo: &str) -> NuevoUsuario {
        NuevoUsuario {
            nombre: "Valentina".to_string(),
            apellido: "Rojas".to_string(),
            correo: Email::parse(correo).unwrap(),
            role: Role::User,
            fecha_nacimiento: None,
            direccion: Some("Av. Providencia 1234".to_string()),
            imagen: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let pool = memory_pool().await.unwrap();
        let users = UserRepository::new(&pool);

        let created = users.create(&nuevo("vale@gmail.com"), "hash").await.unwrap();
        assert_eq!(created.role, Role::User);

        let by_email = users
            .get_by_email(&Email::parse("vale@gmail.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);

        let (_, hash) = users
            .get_password_hash(&created.correo)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hash, "hash");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let pool = memory_pool().await.unwrap();
        let users = UserRepository::new(&pool);

        users.create(&nuevo("vale@gmail.com"), "hash").await.unwrap();
        let err = users.create(&nuevo("vale@gmail.com"), "hash").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let pool = memory_pool().await.unwrap();
        let users = UserRepository::new(&pool);
        let created = users.create(&nuevo("vale@gmail.com"), "hash").await.unwrap();

        let updated = users
            .update(
                created.id,
                &UsuarioChanges {
                    nombre: Some("Valeria".to_string()),
                    role: Some(Role::Vendedor),
                    ..UsuarioChanges::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.nombre, "Valeria");
        assert_eq!(updated.apellido, "Rojas");
        assert_eq!(updated.role, Role::Vendedor);
        assert_eq!(updated.direccion.as_deref(), Some("Av. Providencia 1234"));

        assert!(users
            .update(UsuarioId::new(999), &UsuarioChanges::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_count_and_delete() {
        let pool = memory_pool().await.unwrap();
        let users = UserRepository::new(&pool);
        let a = users.create(&nuevo("a@duoc.cl"), "hash").await.unwrap();
        let mut admin = nuevo("b@duoc.cl");
        admin.role = Role::Admin;
        users.create(&admin, "hash").await.unwrap();

        assert_eq!(users.count(None).await.unwrap(), 2);
        assert_eq!(users.count(Some(Role::Admin)).await.unwrap(), 1);

        assert!(users.delete(a.id).await.unwrap());
        assert!(!users.delete(a.id).await.unwrap());
        assert_eq!(users.count(None).await.unwrap(), 1);
    }
}
