//! Product (pastel) repository.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::instrument;

use pasteleria_core::{PastelId, search_key, slugify};

use super::RepositoryError;
use crate::models::catalog::PastelRow;
use crate::models::{Pastel, PastelInput};

const SELECT_PASTEL: &str = r"
    SELECT p.id, p.nombre, p.slug, p.descripcion, p.precio, p.stock, p.stock_critico,
           p.imagen, p.created_at, p.updated_at,
           c.id AS categoria_id, c.nombre AS categoria_nombre, c.slug AS categoria_slug
    FROM pasteles p
    LEFT JOIN categorias c ON c.id = p.categoria_id";

/// Catalog listing filter (`?categoria=<slug>&q=<text>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct ProductFilter {
    /// Category slug.
    pub categoria: Option<String>,
    /// Free text matched against name and description, ignoring case and
    /// accents.
    pub q: Option<String>,
}

impl ProductFilter {
    /// Drop blank values so `?q=` behaves like no filter.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            categoria: clean(self.categoria).map(|s| s.to_lowercase()),
            q: clean(self.q).map(|s| search_key(&s)),
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List products ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Pastel>, RepositoryError> {
        let pattern = filter
            .q
            .as_deref()
            .map(|q| format!("%{}%", escape_like(&search_key(q))));
        let rows = sqlx::query_as::<_, PastelRow>(&format!(
            r"{SELECT_PASTEL}
            WHERE (?1 IS NULL OR c.slug = ?1)
              AND (?2 IS NULL OR p.busqueda LIKE ?2 ESCAPE '\')
            ORDER BY p.nombre"
        ))
        .bind(filter.categoria.as_deref())
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Pastel::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PastelId) -> Result<Option<Pastel>, RepositoryError> {
        let row = sqlx::query_as::<_, PastelRow>(&format!("{SELECT_PASTEL} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Pastel::from))
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Pastel>, RepositoryError> {
        let row = sqlx::query_as::<_, PastelRow>(&format!("{SELECT_PASTEL} WHERE p.slug = ?"))
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Pastel::from))
    }

    /// Products at or below their critical stock level, lowest stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn critical(&self) -> Result<Vec<Pastel>, RepositoryError> {
        let rows = sqlx::query_as::<_, PastelRow>(&format!(
            "{SELECT_PASTEL} WHERE p.stock <= p.stock_critico ORDER BY p.stock, p.nombre"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Pastel::from).collect())
    }

    /// Current stock for a set of products. Missing products are absent from
    /// the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_levels(
        &self,
        ids: &[PastelId],
    ) -> Result<HashMap<PastelId, u32>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT id, stock FROM pasteles WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<(PastelId, i64)> = query.build_query_as().fetch_all(self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(id, stock)| (id, u32::try_from(stock).unwrap_or(0)))
            .collect())
    }

    /// Create a product; the slug is derived from the name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, input), fields(nombre = %input.nombre))]
    pub async fn create(&self, input: &PastelInput) -> Result<Pastel, RepositoryError> {
        let now = Utc::now();
        let nombre = input.nombre.trim();
        let result = sqlx::query(
            r"
            INSERT INTO pasteles
                (nombre, slug, descripcion, busqueda, precio, stock, stock_critico,
                 categoria_id, imagen, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(nombre)
        .bind(slugify(nombre))
        .bind(input.descripcion.trim())
        .bind(input.search_text())
        .bind(input.precio)
        .bind(input.stock)
        .bind(input.stock_critico)
        .bind(input.categoria_id)
        .bind(&input.imagen)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "ya existe un producto con ese nombre"))?;

        let id = PastelId::new(result.last_insert_rowid());
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace a product's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Conflict` if the new slug is taken.
    #[instrument(skip(self, input), fields(nombre = %input.nombre))]
    pub async fn update(&self, id: PastelId, input: &PastelInput) -> Result<Pastel, RepositoryError> {
        let nombre = input.nombre.trim();
        let result = sqlx::query(
            r"
            UPDATE pasteles SET
                nombre = ?, slug = ?, descripcion = ?, busqueda = ?, precio = ?,
                stock = ?, stock_critico = ?, categoria_id = ?, imagen = ?, updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(nombre)
        .bind(slugify(nombre))
        .bind(input.descripcion.trim())
        .bind(input.search_text())
        .bind(input.precio)
        .bind(input.stock)
        .bind(input.stock_critico)
        .bind(input.categoria_id)
        .bind(&input.imagen)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "ya existe un producto con ese nombre"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Returns whether a row was deleted.
    ///
    /// Cart lines referencing it are removed; order lines keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: PastelId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM pasteles WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of products, and how many are at critical stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self) -> Result<(i64, i64), RepositoryError> {
        let counts: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(stock <= stock_critico), 0) FROM pasteles",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }
}

/// Escape `LIKE` wildcards so user text matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{CategoryRepository, memory_pool};
    use crate::models::CategoriaInput;

    fn input(nombre: &str, stock: i64) -> PastelInput {
        PastelInput {
            nombre: nombre.to_string(),
            descripcion: "Hecho a mano".to_string(),
            precio: 45_000,
            stock,
            stock_critico: 3,
            categoria_id: None,
            imagen: None,
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("torta"), "torta");
    }

    #[test]
    fn test_filter_normalized() {
        let filter = ProductFilter {
            categoria: Some(" Tortas-Cuadradas ".to_string()),
            q: Some("   ".to_string()),
        }
        .normalized();
        assert_eq!(filter.categoria.as_deref(), Some("tortas-cuadradas"));
        assert_eq!(filter.q, None);

        let filter = ProductFilter {
            categoria: None,
            q: Some(" Crème BRÛLÉE ".to_string()),
        }
        .normalized();
        assert_eq!(filter.q.as_deref(), Some("creme brulee"));
    }

    #[tokio::test]
    async fn test_list_filters_by_category_and_text() {
        let pool = memory_pool().await.unwrap();
        let categorias = CategoryRepository::new(&pool);
        let products = ProductRepository::new(&pool);

        let veganos = categorias
            .create(&CategoriaInput {
                nombre: "Productos Veganos".to_string(),
                descripcion: None,
            })
            .await
            .unwrap();

        let mut vegana = input("Torta Vegana de Chocolate", 7);
        vegana.categoria_id = Some(veganos.id);
        products.create(&vegana).await.unwrap();
        products.create(&input("Mousse de Chocolate", 30)).await.unwrap();
        products.create(&input("Tarta de Santiago", 15)).await.unwrap();

        let all = products.list(&ProductFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].nombre, "Mousse de Chocolate");

        let by_cat = products
            .list(&ProductFilter {
                categoria: Some("productos-veganos".to_string()),
                q: None,
            })
            .await
            .unwrap();
        assert_eq!(by_cat.len(), 1);
        assert_eq!(
            by_cat[0].categoria.as_ref().map(|c| c.nombre.as_str()),
            Some("Productos Veganos")
        );

        let by_text = products
            .list(&ProductFilter {
                categoria: None,
                q: Some("CHOCOLATE".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_text.len(), 2);
    }

    #[tokio::test]
    async fn test_text_search_ignores_case_and_accents() {
        let pool = memory_pool().await.unwrap();
        let products = ProductRepository::new(&pool);

        let tiramisu = products.create(&input("Tiramisú Clásico", 5)).await.unwrap();
        let mut pie = input("Pie de Limón", 8);
        pie.descripcion = "Con MERENGUE italiano y limón de Pica".to_string();
        products.create(&pie).await.unwrap();

        let search = |q: &str| ProductFilter {
            categoria: None,
            q: Some(q.to_string()),
        };

        for q in ["TIRAMISÚ", "tiramisu", "CLÁSICO", "clasico"] {
            let found = products.list(&search(q)).await.unwrap();
            assert_eq!(found.len(), 1, "q={q}");
            assert_eq!(found[0].id, tiramisu.id);
        }

        let found = products.list(&search("merengue ITALIANO")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nombre, "Pie de Limón");
        assert_eq!(products.list(&search("LIMÓN")).await.unwrap().len(), 1);

        // Renames are searchable right away
        products
            .update(tiramisu.id, &input("Tiramisú de Maracuyá", 5))
            .await
            .unwrap();
        assert!(products.list(&search("clásico")).await.unwrap().is_empty());
        assert_eq!(products.list(&search("MARACUYA")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_slug_conflict_and_update() {
        let pool = memory_pool().await.unwrap();
        let products = ProductRepository::new(&pool);

        let created = products.create(&input("Brownie Sin Gluten", 20)).await.unwrap();
        assert_eq!(created.slug, "brownie-sin-gluten");
        assert!(matches!(
            products.create(&input("Brownie sin gluten", 1)).await.unwrap_err(),
            RepositoryError::Conflict(_)
        ));

        let updated = products
            .update(created.id, &input("Brownie Sin Gluten XL", 2))
            .await
            .unwrap();
        assert_eq!(updated.slug, "brownie-sin-gluten-xl");
        assert_eq!(updated.stock, 2);

        assert!(matches!(
            products.update(PastelId::new(999), &input("Nada", 1)).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_critical_and_stock_levels() {
        let pool = memory_pool().await.unwrap();
        let products = ProductRepository::new(&pool);

        let low = products.create(&input("Torta Especial de Boda", 2)).await.unwrap();
        let ok = products.create(&input("Empanada de Manzana", 40)).await.unwrap();

        let critical = products.critical().await.unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].id, low.id);

        let levels = products
            .stock_levels(&[low.id, ok.id, PastelId::new(999)])
            .await
            .unwrap();
        assert_eq!(levels.get(&low.id), Some(&2));
        assert_eq!(levels.get(&ok.id), Some(&40));
        assert!(!levels.contains_key(&PastelId::new(999)));

        assert_eq!(products.counts().await.unwrap(), (2, 1));
    }
}
