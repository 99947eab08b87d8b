//! Catalog types: categories and products (pasteles).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pasteleria_core::{CategoriaId, PastelId, Price, search_key, slugify};

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Categoria {
    pub id: CategoriaId,
    pub nombre: String,
    pub slug: String,
    pub descripcion: Option<String>,
}

/// A category with the number of products in it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoriaConConteo {
    pub id: CategoriaId,
    pub nombre: String,
    pub slug: String,
    pub descripcion: Option<String>,
    pub product_count: i64,
}

/// Category summary embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoriaRef {
    pub id: CategoriaId,
    pub nombre: String,
    pub slug: String,
}

/// A product as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct Pastel {
    pub id: PastelId,
    pub nombre: String,
    pub slug: String,
    pub descripcion: String,
    /// Price in whole Chilean pesos.
    pub precio: i64,
    /// Formatted price (e.g. "$45.000").
    pub precio_display: String,
    pub stock: i64,
    pub stock_critico: i64,
    pub categoria: Option<CategoriaRef>,
    pub imagen: Option<String>,
    /// Whether at least one unit is in stock.
    pub disponible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pastel {
    /// Stock as an unsigned quantity for cart arithmetic.
    #[must_use]
    pub fn available(&self) -> u32 {
        u32::try_from(self.stock).unwrap_or(0)
    }

    /// Whether stock is at or below the critical threshold.
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        self.stock <= self.stock_critico
    }
}

/// Flat row from `pasteles LEFT JOIN categorias`.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PastelRow {
    pub id: PastelId,
    pub nombre: String,
    pub slug: String,
    pub descripcion: String,
    pub precio: i64,
    pub stock: i64,
    pub stock_critico: i64,
    pub imagen: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub categoria_id: Option<CategoriaId>,
    pub categoria_nombre: Option<String>,
    pub categoria_slug: Option<String>,
}

impl From<PastelRow> for Pastel {
    fn from(row: PastelRow) -> Self {
        let categoria = match (row.categoria_id, row.categoria_nombre, row.categoria_slug) {
            (Some(id), Some(nombre), Some(slug)) => Some(CategoriaRef { id, nombre, slug }),
            _ => None,
        };

        Self {
            id: row.id,
            precio_display: Price::clp(row.precio).display(),
            disponible: row.stock > 0,
            nombre: row.nombre,
            slug: row.slug,
            descripcion: row.descripcion,
            precio: row.precio,
            stock: row.stock,
            stock_critico: row.stock_critico,
            categoria,
            imagen: row.imagen,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Highest accepted unit price, in CLP.
pub const MAX_PRECIO: i64 = 100_000_000;

/// Highest accepted stock or critical-stock level.
pub const MAX_STOCK: i64 = 100_000;

/// Product create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PastelInput {
    pub nombre: String,
    #[serde(default)]
    pub descripcion: String,
    pub precio: i64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub stock_critico: i64,
    pub categoria_id: Option<CategoriaId>,
    pub imagen: Option<String>,
}

impl PastelInput {
    /// Folded name and description stored for catalog search.
    #[must_use]
    pub fn search_text(&self) -> String {
        search_key(&format!("{} {}", self.nombre.trim(), self.descripcion.trim()))
    }

    /// Check field ranges.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.nombre.trim().is_empty() {
            return Err("el nombre es obligatorio".to_string());
        }
        if slugify(&self.nombre).is_empty() {
            return Err("el nombre debe contener letras o números".to_string());
        }
        if self.precio < 0 {
            return Err("el precio no puede ser negativo".to_string());
        }
        if self.precio > MAX_PRECIO {
            return Err(format!("el precio no puede superar {MAX_PRECIO}"));
        }
        if self.stock < 0 {
            return Err("el stock no puede ser negativo".to_string());
        }
        if self.stock_critico < 0 {
            return Err("el stock crítico no puede ser negativo".to_string());
        }
        if self.stock > MAX_STOCK || self.stock_critico > MAX_STOCK {
            return Err(format!("el stock no puede superar {MAX_STOCK}"));
        }
        Ok(())
    }
}

/// Category create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoriaInput {
    pub nombre: String,
    pub descripcion: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> PastelInput {
        PastelInput {
            nombre: "Mousse de Chocolate".to_string(),
            descripcion: String::new(),
            precio: 5000,
            stock: 30,
            stock_critico: 8,
            categoria_id: None,
            imagen: None,
        }
    }

    #[test]
    fn test_pastel_input_validation() {
        assert!(input().validate().is_ok());

        let mut bad = input();
        bad.nombre = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.precio = -1;
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.stock_critico = -5;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_pastel_input_bounds() {
        let mut ok = input();
        ok.precio = MAX_PRECIO;
        ok.stock = MAX_STOCK;
        assert!(ok.validate().is_ok());

        let mut bad = input();
        bad.precio = i64::MAX;
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.stock = MAX_STOCK + 1;
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.stock_critico = i64::MAX;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_pastel_input_needs_a_sluggable_name() {
        let mut bad = input();
        bad.nombre = "!!!".to_string();
        assert_eq!(
            bad.validate().unwrap_err(),
            "el nombre debe contener letras o números"
        );

        let mut ok = input();
        ok.nombre = "Ñandú".to_string();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_row_conversion_builds_display_fields() {
        let now = Utc::now();
        let pastel = Pastel::from(PastelRow {
            id: PastelId::new(1),
            nombre: "Torta Cuadrada de Chocolate".to_string(),
            slug: "torta-cuadrada-de-chocolate".to_string(),
            descripcion: String::new(),
            precio: 45_000,
            stock: 0,
            stock_critico: 3,
            imagen: None,
            created_at: now,
            updated_at: now,
            categoria_id: Some(CategoriaId::new(2)),
            categoria_nombre: Some("Tortas Cuadradas".to_string()),
            categoria_slug: Some("tortas-cuadradas".to_string()),
        });

        assert_eq!(pastel.precio_display, "$45.000");
        assert!(!pastel.disponible);
        assert!(pastel.is_critical());
        assert_eq!(pastel.available(), 0);
        assert_eq!(pastel.categoria.map(|c| c.slug).as_deref(), Some("tortas-cuadradas"));
    }
}
