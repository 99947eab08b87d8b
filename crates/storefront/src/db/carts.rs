//! Cart repository.
//!
//! A cart row is keyed by a UUID string. User carts also carry `usuario_id`
//! (unique); guest carts have it NULL and are found through the session.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use pasteleria_core::{Cart, CartLine, PastelId, UsuarioId};

use super::RepositoryError;

/// A cart line joined with its product, in cart order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartProductRow {
    pub pastel_id: PastelId,
    pub cantidad: i64,
    pub nombre: String,
    pub precio: i64,
    pub imagen: Option<String>,
    pub stock: i64,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a user's cart ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_for_user(&self, usuario_id: UsuarioId) -> Result<Option<String>, RepositoryError> {
        let id: Option<(String,)> = sqlx::query_as("SELECT id FROM carritos WHERE usuario_id = ?")
            .bind(usuario_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(id.map(|(id,)| id))
    }

    /// Get or create a user's cart ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure_for_user(&self, usuario_id: UsuarioId) -> Result<String, RepositoryError> {
        sqlx::query(
            "INSERT INTO carritos (id, usuario_id, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT (usuario_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(usuario_id)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        self.find_for_user(usuario_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Make sure a guest cart row exists for `cart_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure_guest(&self, cart_id: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO carritos (id, usuario_id, updated_at) VALUES (?, NULL, ?) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(cart_id)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Whether a cart row exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, cart_id: &str) -> Result<bool, RepositoryError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM carritos WHERE id = ?")
            .bind(cart_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Load a cart's lines. Unknown carts load as empty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load(&self, cart_id: &str) -> Result<Cart, RepositoryError> {
        let rows: Vec<(PastelId, i64)> = sqlx::query_as(
            "SELECT pastel_id, cantidad FROM carrito_items WHERE carrito_id = ? ORDER BY posicion",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(Cart::from_lines(rows.into_iter().filter_map(|(pastel_id, cantidad)| {
            u32::try_from(cantidad)
                .ok()
                .map(|cantidad| CartLine { pastel_id, cantidad })
        })))
    }

    /// Load a cart's lines joined with product data, in cart order.
    ///
    /// Lines whose product no longer exists are not returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load_with_products(&self, cart_id: &str) -> Result<Vec<CartProductRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartProductRow>(
            r"
            SELECT ci.pastel_id, ci.cantidad, p.nombre, p.precio, p.imagen, p.stock
            FROM carrito_items ci
            JOIN pasteles p ON p.id = ci.pastel_id
            WHERE ci.carrito_id = ?
            ORDER BY ci.posicion
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Replace a cart's lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn save(&self, cart_id: &str, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM carrito_items WHERE carrito_id = ?")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        for (posicion, line) in (0_i64..).zip(cart.lines()) {
            sqlx::query(
                "INSERT INTO carrito_items (carrito_id, pastel_id, cantidad, posicion) VALUES (?, ?, ?, ?)",
            )
            .bind(cart_id)
            .bind(line.pastel_id)
            .bind(i64::from(line.cantidad))
            .bind(posicion)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE carritos SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a cart and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, cart_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM carritos WHERE id = ?")
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{ProductRepository, memory_pool};
    use crate::models::PastelInput;

    async fn product(pool: &SqlitePool, nombre: &str) -> PastelId {
        ProductRepository::new(pool)
            .create(&PastelInput {
                nombre: nombre.to_string(),
                descripcion: String::new(),
                precio: 5_000,
                stock: 10,
                stock_critico: 2,
                categoria_id: None,
                imagen: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_save_and_load_keeps_order() {
        let pool = memory_pool().await.unwrap();
        let a = product(&pool, "Mousse de Chocolate").await;
        let b = product(&pool, "Tiramisú Clásico").await;
        let carts = CartRepository::new(&pool);

        let cart_id = Uuid::new_v4().to_string();
        carts.ensure_guest(&cart_id).await.unwrap();

        let mut cart = Cart::new();
        cart.add(b, 2, 10).unwrap();
        cart.add(a, 1, 10).unwrap();
        carts.save(&cart_id, &cart).await.unwrap();

        let loaded = carts.load(&cart_id).await.unwrap();
        assert_eq!(loaded, cart);

        let rows = carts.load_with_products(&cart_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].nombre, "Tiramisú Clásico");
        assert_eq!(rows[0].cantidad, 2);
    }

    #[tokio::test]
    async fn test_user_cart_is_unique() {
        let pool = memory_pool().await.unwrap();
        sqlx::query(
            "INSERT INTO usuarios (nombre, apellido, correo, password_hash, created_at, updated_at) \
             VALUES ('Ana', 'Pérez', 'ana@duoc.cl', 'x', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let carts = CartRepository::new(&pool);

        let first = carts.ensure_for_user(UsuarioId::new(1)).await.unwrap();
        let second = carts.ensure_for_user(UsuarioId::new(1)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_cart_loads_empty_and_delete_cascades() {
        let pool = memory_pool().await.unwrap();
        let a = product(&pool, "Brownie Sin Gluten").await;
        let carts = CartRepository::new(&pool);

        assert!(carts.load("missing").await.unwrap().is_empty());

        carts.ensure_guest("guest-1").await.unwrap();
        let mut cart = Cart::new();
        cart.add(a, 1, 10).unwrap();
        carts.save("guest-1", &cart).await.unwrap();

        carts.delete("guest-1").await.unwrap();
        assert!(!carts.exists("guest-1").await.unwrap());
        assert!(carts.load("guest-1").await.unwrap().is_empty());
    }
}
