//! Seed the catalog from a JSON file.
//!
//! The file holds `{"categorias": [...], "pasteles": [...]}`. Products are
//! upserted by slug, so the command can be re-run after editing the file.

use std::path::Path;

use tracing::{info, warn};

use pasteleria_storefront::db::{self, seed};

/// Load `file` into the database at `database`.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed, the database does
/// not exist, or a write fails.
pub async fn catalog(database: &Path, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    info!(path = %file.display(), "Loading catalog from file");
    let catalog = seed::load_catalog(file)?;
    info!(
        categorias = catalog.categorias.len(),
        pasteles = catalog.pasteles.len(),
        "Parsed catalog"
    );

    let pool = db::open(database, false).await?;
    let report = seed::seed_catalog(&pool, &catalog).await?;
    pool.close().await;

    info!("Seeding complete!");
    info!("  Categories upserted: {}", report.categorias);
    info!("  Products upserted: {}", report.pasteles);
    if report.skipped > 0 {
        warn!("  Entries skipped: {}", report.skipped);
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_requires_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("pasteleria.db");
        let file = dir.path().join("catalog.json");
        std::fs::write(
            &file,
            r#"{"categorias": [{"nombre": "Tortas"}], "pasteles": [
                {"nombre": "Torta de Chocolate", "precio": 45000, "stock": 5, "categoria": "Tortas"}
            ]}"#,
        )
        .unwrap();

        assert!(catalog(&database, &file).await.is_err());

        super::super::migrate::run(&database).await.unwrap();
        catalog(&database, &file).await.unwrap();

        let pool = db::open(&database, false).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pasteles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_seed_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = catalog(&dir.path().join("db"), &dir.path().join("nope.json")).await;
        assert!(result.unwrap_err().to_string().contains("File not found"));
    }
}
