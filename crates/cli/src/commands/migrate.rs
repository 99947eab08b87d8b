//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! pasteleria-cli migrate
//! pasteleria-cli --database /var/lib/pasteleria/pasteleria.db migrate
//! ```
//!
//! Creates the SQLite file when it does not exist yet, then applies the
//! storefront migrations from `crates/storefront/migrations/`.

use std::path::Path;

use pasteleria_storefront::db::{self, DatabaseError};

/// Create the database if needed and apply pending migrations.
///
/// # Errors
///
/// Returns `DatabaseError` if the file cannot be opened or a migration fails.
pub async fn run(database: &Path) -> Result<(), DatabaseError> {
    tracing::info!(path = %database.display(), "Running storefront migrations...");
    let pool = db::open(database, true).await?;
    pool.close().await;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pasteleria.db");

        run(&path).await.unwrap();
        assert!(path.exists());

        // Second run is a no-op
        run(&path).await.unwrap();
    }
}
