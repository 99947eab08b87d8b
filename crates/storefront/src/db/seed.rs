//! Catalog seeding from a JSON file.
//!
//! The seed file has the shape `{"categorias": [...], "pasteles": [...]}`;
//! products name their category instead of referencing an id. Seeding
//! upserts by slug so it can be re-run safely. Entries that fail validation
//! are skipped with a warning rather than aborting the whole seed.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use pasteleria_core::{CategoriaId, search_key, slugify};

use super::RepositoryError;
use crate::models::catalog::{MAX_PRECIO, MAX_STOCK};

/// Errors loading or applying a seed catalog.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for SeedError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// A seed catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub categorias: Vec<SeedCategoria>,
    #[serde(default)]
    pub pasteles: Vec<SeedPastel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCategoria {
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedPastel {
    pub nombre: String,
    #[serde(default)]
    pub descripcion: String,
    pub precio: i64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub stock_critico: i64,
    /// Category name.
    pub categoria: Option<String>,
    pub imagen: Option<String>,
}

/// What a seed run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categorias: usize,
    pub pasteles: usize,
    pub skipped: usize,
}

/// Parse a seed catalog file.
///
/// # Errors
///
/// Returns `SeedError` if the file can't be read or isn't valid JSON.
pub fn load_catalog(path: &Path) -> Result<SeedCatalog, SeedError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Upsert a seed catalog in one transaction.
///
/// # Errors
///
/// Returns `SeedError::Repository` if a write fails.
#[instrument(skip_all, fields(categorias = catalog.categorias.len(), pasteles = catalog.pasteles.len()))]
pub async fn seed_catalog(pool: &SqlitePool, catalog: &SeedCatalog) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();
    let mut tx = pool.begin().await?;

    for categoria in &catalog.categorias {
        let nombre = categoria.nombre.trim();
        let slug = slugify(nombre);
        if slug.is_empty() {
            tracing::warn!(nombre, "Skipping seed category with empty name");
            report.skipped += 1;
            continue;
        }

        sqlx::query(
            r"
            INSERT INTO categorias (nombre, slug, descripcion) VALUES (?, ?, ?)
            ON CONFLICT (slug) DO UPDATE SET nombre = excluded.nombre, descripcion = excluded.descripcion
            ",
        )
        .bind(nombre)
        .bind(&slug)
        .bind(&categoria.descripcion)
        .execute(&mut *tx)
        .await?;
        report.categorias += 1;
    }

    let rows: Vec<(CategoriaId, String)> = sqlx::query_as("SELECT id, nombre FROM categorias")
        .fetch_all(&mut *tx)
        .await?;
    let categorias: HashMap<String, CategoriaId> = rows
        .into_iter()
        .map(|(id, nombre)| (nombre.to_lowercase(), id))
        .collect();

    for pastel in &catalog.pasteles {
        let nombre = pastel.nombre.trim();
        let slug = slugify(nombre);
        if slug.is_empty()
            || !(0..=MAX_PRECIO).contains(&pastel.precio)
            || !(0..=MAX_STOCK).contains(&pastel.stock)
            || !(0..=MAX_STOCK).contains(&pastel.stock_critico)
        {
            tracing::warn!(nombre, "Skipping invalid seed product");
            report.skipped += 1;
            continue;
        }

        let categoria_id = match pastel.categoria.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => {
                let Some(id) = categorias.get(&name.to_lowercase()) else {
                    tracing::warn!(nombre, categoria = name, "Skipping seed product with unknown category");
                    report.skipped += 1;
                    continue;
                };
                Some(*id)
            }
        };

        let now = Utc::now();
        sqlx::query(
            r"
            INSERT INTO pasteles
                (nombre, slug, descripcion, busqueda, precio, stock, stock_critico,
                 categoria_id, imagen, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (slug) DO UPDATE SET
                nombre = excluded.nombre,
                descripcion = excluded.descripcion,
                busqueda = excluded.busqueda,
                precio = excluded.precio,
                stock = excluded.stock,
                stock_critico = excluded.stock_critico,
                categoria_id = excluded.categoria_id,
                imagen = excluded.imagen,
                updated_at = excluded.updated_at
            ",
        )
        .bind(nombre)
        .bind(&slug)
        .bind(pastel.descripcion.trim())
        .bind(search_key(&format!("{nombre} {}", pastel.descripcion.trim())))
        .bind(pastel.precio)
        .bind(pastel.stock)
        .bind(pastel.stock_critico)
        .bind(categoria_id)
        .bind(&pastel.imagen)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        report.pasteles += 1;
    }

    tx.commit().await?;
    tracing::info!(?report, "Catalog seeded");
    Ok(report)
}
