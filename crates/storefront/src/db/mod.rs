//! Database operations for the storefront SQLite store.
//!
//! # Database: `pasteleria.db`
//!
//! Single source of truth for the catalog, accounts, carts and orders.
//!
//! ## Tables
//!
//! - `categorias` - Product categories
//! - `pasteles` - Products with price and stock
//! - `usuarios` - Accounts (customers, `admin`, `vendedor`)
//! - `carritos` / `carrito_items` - Guest and user carts
//! - `pedidos` / `pedido_items` - Orders with prices captured at purchase time
//! - `reportes_contacto` - Contact form submissions
//! - `tower_sessions` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded in the
//! binary. They run on every `open`, or explicitly via:
//! ```bash
//! cargo run -p pasteleria-cli -- migrate
//! ```

pub mod carts;
pub mod categories;
pub mod contact;
pub mod orders;
pub mod products;
pub mod seed;
pub mod users;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use thiserror::Error;

pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use contact::ContactRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_unique(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Errors opening the database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The database file does not exist and creation was not requested.
    #[error("database file {0} not found (set IGNORE_DB_MISSING=1 to create it)")]
    Missing(PathBuf),

    /// Connection or pragma failure.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration failure.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open the SQLite database and run pending migrations.
///
/// When the file is missing and `create_if_missing` is false, the database is
/// not created and `DatabaseError::Missing` is returned.
///
/// # Errors
///
/// Returns `DatabaseError` if the file is missing, the connection fails, or a
/// migration fails.
pub async fn open(path: &Path, create_if_missing: bool) -> Result<SqlitePool, DatabaseError> {
    if !create_if_missing && !path.exists() {
        return Err(DatabaseError::Missing(path.to_path_buf()));
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .pragma("foreign_keys", "ON");

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    tracing::info!(path = %path.display(), "Database connection established (SQLite WAL)");

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Create a migrated in-memory database.
///
/// Uses a single connection that is never recycled, so every query sees the
/// same database.
///
/// # Errors
///
/// Returns `DatabaseError` if the connection or a migration fails.
pub async fn memory_pool() -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.pragma("foreign_keys", "ON");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run embedded migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::debug!("Database migrations applied");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_refuses_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let err = open(&path, false).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Missing(p) if p == path));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_open_creates_file_when_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pasteleria.db");

        let pool = open(&path, true).await.unwrap();
        assert!(path.exists());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pasteles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        pool.close().await;
        // Reopening an existing file does not need the flag.
        let pool = open(&path, false).await.unwrap();
        pool.close().await;
    }

    #[tokio::test]
    async fn test_memory_pool_enforces_foreign_keys() {
        let pool = memory_pool().await.unwrap();
        let result = sqlx::query(
            "INSERT INTO carrito_items (carrito_id, pastel_id, cantidad, posicion) VALUES ('x', 1, 1, 0)",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
