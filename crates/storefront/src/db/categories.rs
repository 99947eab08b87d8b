//! Category repository.

use sqlx::SqlitePool;

use pasteleria_core::{CategoriaId, slugify};

use super::RepositoryError;
use crate::models::{Categoria, CategoriaConConteo, CategoriaInput};

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List categories ordered by name, with product counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_counts(&self) -> Result<Vec<CategoriaConConteo>, RepositoryError> {
        let categorias = sqlx::query_as::<_, CategoriaConConteo>(
            r"
            SELECT c.id, c.nombre, c.slug, c.descripcion, COUNT(p.id) AS product_count
            FROM categorias c
            LEFT JOIN pasteles p ON p.categoria_id = c.id
            GROUP BY c.id
            ORDER BY c.nombre
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categorias)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoriaId) -> Result<Option<Categoria>, RepositoryError> {
        let categoria = sqlx::query_as::<_, Categoria>(
            "SELECT id, nombre, slug, descripcion FROM categorias WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(categoria)
    }

    /// Get a category by exact name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_name(&self, nombre: &str) -> Result<Option<Categoria>, RepositoryError> {
        let categoria = sqlx::query_as::<_, Categoria>(
            "SELECT id, nombre, slug, descripcion FROM categorias WHERE nombre = ?",
        )
        .bind(nombre.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(categoria)
    }

    /// Create a category; the slug is derived from the name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    pub async fn create(&self, input: &CategoriaInput) -> Result<Categoria, RepositoryError> {
        let nombre = input.nombre.trim();
        let result =
            sqlx::query("INSERT INTO categorias (nombre, slug, descripcion) VALUES (?, ?, ?)")
                .bind(nombre)
                .bind(slugify(nombre))
                .bind(&input.descripcion)
                .execute(self.pool)
                .await
                .map_err(|e| RepositoryError::from_unique(e, "ya existe una categoría con ese nombre"))?;

        let id = CategoriaId::new(result.last_insert_rowid());
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Rename or re-describe a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist, or
    /// `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: CategoriaId,
        input: &CategoriaInput,
    ) -> Result<Categoria, RepositoryError> {
        let nombre = input.nombre.trim();
        let result =
            sqlx::query("UPDATE categorias SET nombre = ?, slug = ?, descripcion = ? WHERE id = ?")
                .bind(nombre)
                .bind(slugify(nombre))
                .bind(&input.descripcion)
                .bind(id)
                .execute(self.pool)
                .await
                .map_err(|e| RepositoryError::from_unique(e, "ya existe una categoría con ese nombre"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a category that has no products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if products still reference it, or
    /// `RepositoryError::NotFound` if it does not exist.
    pub async fn delete(&self, id: CategoriaId) -> Result<(), RepositoryError> {
        let (in_use,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM pasteles WHERE categoria_id = ?")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        if in_use > 0 {
            return Err(RepositoryError::Conflict(format!(
                "la categoría tiene {in_use} productos"
            )));
        }

        let result = sqlx::query("DELETE FROM categorias WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
