//! Contact report repository.

use chrono::Utc;
use sqlx::SqlitePool;

use pasteleria_core::ReporteId;

use super::RepositoryError;
use crate::models::{NuevoReporte, ReporteContacto};

/// Repository for contact form submissions.
pub struct ContactRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a submission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, reporte: &NuevoReporte) -> Result<ReporteContacto, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO reportes_contacto (nombre, correo, mensaje, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&reporte.nombre)
        .bind(&reporte.correo)
        .bind(&reporte.mensaje)
        .bind(created_at)
        .execute(self.pool)
        .await?;

        Ok(ReporteContacto {
            id: ReporteId::new(result.last_insert_rowid()),
            nombre: reporte.nombre.clone(),
            correo: reporte.correo.clone(),
            mensaje: reporte.mensaje.clone(),
            created_at,
        })
    }

    /// All submissions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ReporteContacto>, RepositoryError> {
        let reportes = sqlx::query_as::<_, ReporteContacto>(
            "SELECT id, nombre, correo, mensaje, created_at FROM reportes_contacto ORDER BY id DESC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(reportes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use pasteleria_core::Email;

    #[tokio::test]
    async fn test_create_and_list_newest_first() {
        let pool = memory_pool().await.unwrap();
        let repo = ContactRepository::new(&pool);

        for mensaje in ["¿Hacen despacho a Viña?", "Quisiera cotizar una torta de bodas"] {
            repo.create(&NuevoReporte {
                nombre: "Camila Rojas".to_string(),
                correo: Email::parse("camila@gmail.com").unwrap(),
                mensaje: mensaje.to_string(),
            })
            .await
            .unwrap();
        }

        let reportes = repo.list().await.unwrap();
        assert_eq!(reportes.len(), 2);
        assert_eq!(reportes[0].mensaje, "Quisiera cotizar una torta de bodas");
        assert_eq!(reportes[1].correo.as_str(), "camila@gmail.com");
    }
}
