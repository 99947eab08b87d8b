//! Cart operations over the `carritos` tables.
//!
//! Every mutation loads the stored cart, applies the core cart arithmetic
//! against current stock, persists the result and publishes a
//! `cartUpdated` event. Reads re-clamp lines to current stock and persist
//! the correction, so a cart never shows more units than exist.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use pasteleria_core::{Cart, CartError, PastelId, Price};

use crate::db::carts::CartProductRow;
use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::events::CartEvents;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("product {0} not found")]
    ProductNotFound(PastelId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A cart line as shown to the shopper.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: PastelId,
    pub nombre: String,
    pub precio: i64,
    pub imagen: Option<String>,
    pub cantidad: u32,
    pub stock: i64,
    pub subtotal: i64,
}

/// Full cart view returned by every cart endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: i64,
    pub total_display: String,
    pub item_count: u32,
}

impl CartView {
    fn build(cart: &Cart, rows: &HashMap<PastelId, CartProductRow>) -> Self {
        let items: Vec<CartItemView> = cart
            .lines()
            .iter()
            .filter_map(|line| {
                let row = rows.get(&line.pastel_id)?;
                Some(CartItemView {
                    id: line.pastel_id,
                    nombre: row.nombre.clone(),
                    precio: row.precio,
                    imagen: row.imagen.clone(),
                    cantidad: line.cantidad,
                    stock: row.stock,
                    subtotal: row.precio.saturating_mul(i64::from(line.cantidad)),
                })
            })
            .collect();

        let total = items.iter().map(|i| i.subtotal).fold(0, i64::saturating_add);
        Self {
            total_display: Price::clp(total).display(),
            item_count: items.iter().map(|i| i.cantidad).fold(0, u32::saturating_add),
            total,
            items,
        }
    }

    /// View of a cart that doesn't exist yet.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_display: Price::clp(0).display(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cart service.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
    events: &'a CartEvents,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, events: &'a CartEvents) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
            events,
        }
    }

    /// Current cart contents, re-clamped to stock. A re-clamp is saved and
    /// published like any other change.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if a query fails.
    pub async fn view(&self, cart_id: &str) -> Result<CartView, CartServiceError> {
        let stored = self.carts.load(cart_id).await?;
        let rows: HashMap<PastelId, CartProductRow> = self
            .carts
            .load_with_products(cart_id)
            .await?
            .into_iter()
            .map(|row| (row.pastel_id, row))
            .collect();

        let mut cart = stored;
        let changed = cart.clamp_to_stock(|id| {
            rows.get(&id).map(|row| u32::try_from(row.stock).unwrap_or(0))
        });
        if changed {
            tracing::info!(cart_id, "Cart re-clamped to current stock");
            self.carts.save(cart_id, &cart).await?;
            self.events.publish(cart_id, cart.item_count());
        }

        Ok(CartView::build(&cart, &rows))
    }

    /// Number of units in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if a query fails.
    pub async fn count(&self, cart_id: &str) -> Result<u32, CartServiceError> {
        Ok(self.view(cart_id).await?.item_count)
    }

    /// Add units of a product.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` for unknown products, or `Cart` for a zero
    /// quantity or an out-of-stock product.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        cart_id: &str,
        pastel_id: PastelId,
        cantidad: u32,
    ) -> Result<CartView, CartServiceError> {
        let product = self
            .products
            .get(pastel_id)
            .await?
            .ok_or(CartServiceError::ProductNotFound(pastel_id))?;

        let mut cart = self.carts.load(cart_id).await?;
        cart.add(pastel_id, cantidad, product.available())?;
        self.commit(cart_id, &cart).await
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `Cart(LineNotFound)` if the product is not in the cart.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        cart_id: &str,
        pastel_id: PastelId,
        cantidad: u32,
    ) -> Result<CartView, CartServiceError> {
        let stock = self
            .products
            .get(pastel_id)
            .await?
            .map_or(0, |p| p.available());

        let mut cart = self.carts.load(cart_id).await?;
        cart.set_quantity(pastel_id, cantidad, stock)?;
        self.commit(cart_id, &cart).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `Cart(LineNotFound)` if the product is not in the cart.
    pub async fn remove(&self, cart_id: &str, pastel_id: PastelId) -> Result<CartView, CartServiceError> {
        let mut cart = self.carts.load(cart_id).await?;
        if !cart.remove(pastel_id) {
            return Err(CartError::LineNotFound(pastel_id).into());
        }
        self.commit(cart_id, &cart).await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if a query fails.
    pub async fn clear(&self, cart_id: &str) -> Result<CartView, CartServiceError> {
        self.commit(cart_id, &Cart::new()).await
    }

    /// Merge a guest cart into a user's cart and delete the guest cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Repository` if a query fails.
    #[instrument(skip(self))]
    pub async fn merge_guest(&self, guest_cart_id: &str, user_cart_id: &str) -> Result<(), CartServiceError> {
        if guest_cart_id == user_cart_id {
            return Ok(());
        }

        let guest = self.carts.load(guest_cart_id).await?;
        if guest.is_empty() {
            self.carts.delete(guest_cart_id).await?;
            return Ok(());
        }

        let mut cart = self.carts.load(user_cart_id).await?;
        let ids: Vec<PastelId> = cart
            .lines()
            .iter()
            .chain(guest.lines())
            .map(|l| l.pastel_id)
            .collect();
        let stock = self.products.stock_levels(&ids).await?;

        cart.merge(&guest, |id| stock.get(&id).copied());
        self.carts.save(user_cart_id, &cart).await?;
        self.carts.delete(guest_cart_id).await?;

        tracing::info!(items = cart.item_count(), "Guest cart merged into user cart");
        self.events.publish(user_cart_id, cart.item_count());
        Ok(())
    }

    async fn commit(&self, cart_id: &str, cart: &Cart) -> Result<CartView, CartServiceError> {
        self.carts.save(cart_id, cart).await?;
        let view = self.view(cart_id).await?;
        self.events.publish(cart_id, view.item_count);
        Ok(view)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::pin::pin;
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;
    use crate::db::memory_pool;
    use crate::models::PastelInput;

    async fn product(pool: &SqlitePool, nombre: &str, precio: i64, stock: i64) -> PastelId {
        ProductRepository::new(pool)
            .create(&PastelInput {
                nombre: nombre.to_string(),
                descripcion: String::new(),
                precio,
                stock,
                stock_critico: 0,
                categoria_id: None,
                imagen: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn guest(pool: &SqlitePool, id: &str) -> String {
        CartRepository::new(pool).ensure_guest(id).await.unwrap();
        id.to_string()
    }

    #[tokio::test]
    async fn test_add_clamps_and_totals() {
        let pool = memory_pool().await.unwrap();
        let events = CartEvents::new();
        let service = CartService::new(&pool, &events);
        let mousse = product(&pool, "Mousse de Chocolate", 5_000, 3).await;
        let cart_id = guest(&pool, "guest-1").await;

        let view = service.add(&cart_id, mousse, 2).await.unwrap();
        assert_eq!(view.item_count, 2);

        let view = service.add(&cart_id, mousse, 5).await.unwrap();
        assert_eq!(view.item_count, 3);
        assert_eq!(view.total, 15_000);
        assert_eq!(view.total_display, "$15.000");
        assert_eq!(view.items[0].subtotal, 15_000);
    }

    #[tokio::test]
    async fn test_errors() {
        let pool = memory_pool().await.unwrap();
        let events = CartEvents::new();
        let service = CartService::new(&pool, &events);
        let agotado = product(&pool, "Torta Especial de Boda", 60_000, 0).await;
        let cart_id = guest(&pool, "guest-1").await;

        assert!(matches!(
            service.add(&cart_id, PastelId::new(404), 1).await,
            Err(CartServiceError::ProductNotFound(_))
        ));
        assert!(matches!(
            service.add(&cart_id, agotado, 1).await,
            Err(CartServiceError::Cart(CartError::OutOfStock(_)))
        ));
        assert!(matches!(
            service.remove(&cart_id, agotado).await,
            Err(CartServiceError::Cart(CartError::LineNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_view_reclamps_after_stock_drop() {
        let pool = memory_pool().await.unwrap();
        let events = CartEvents::new();
        let service = CartService::new(&pool, &events);
        let tarta = product(&pool, "Tarta de Santiago", 6_000, 10).await;
        let cart_id = guest(&pool, "guest-1").await;

        service.add(&cart_id, tarta, 8).await.unwrap();
        sqlx::query("UPDATE pasteles SET stock = 2 WHERE id = ?")
            .bind(tarta)
            .execute(&pool)
            .await
            .unwrap();

        let mut changes = pin!(events.subscribe(cart_id.clone()));

        let view = service.view(&cart_id).await.unwrap();
        assert_eq!(view.item_count, 2);
        assert_eq!(CartRepository::new(&pool).load(&cart_id).await.unwrap().quantity_of(tarta), 2);

        let published = tokio::time::timeout(Duration::from_secs(1), changes.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(published.item_count, 2);

        // Nothing left to clamp, nothing published
        service.view(&cart_id).await.unwrap();
        assert!(
            tokio::time::timeout(Duration::from_millis(50), changes.next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_merge_guest_sums_and_clamps() {
        let pool = memory_pool().await.unwrap();
        let events = CartEvents::new();
        let service = CartService::new(&pool, &events);
        let a = product(&pool, "Brownie Sin Gluten", 4_000, 5).await;
        let b = product(&pool, "Galletas Veganas de Avena", 4_500, 10).await;
        let user_cart = guest(&pool, "user-cart").await;
        let guest_cart = guest(&pool, "guest-cart").await;

        service.add(&user_cart, a, 3).await.unwrap();
        service.add(&guest_cart, a, 4).await.unwrap();
        service.add(&guest_cart, b, 1).await.unwrap();

        service.merge_guest(&guest_cart, &user_cart).await.unwrap();

        let view = service.view(&user_cart).await.unwrap();
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[0].cantidad, 5);
        assert_eq!(view.items[1].cantidad, 1);
        assert!(!CartRepository::new(&pool).exists(&guest_cart).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_quantity_zero_and_clear() {
        let pool = memory_pool().await.unwrap();
        let events = CartEvents::new();
        let service = CartService::new(&pool, &events);
        let a = product(&pool, "Cheesecake Sin Azúcar", 47_000, 6).await;
        let b = product(&pool, "Pie de Limón", 12_000, 6).await;
        let cart_id = guest(&pool, "guest-1").await;

        service.add(&cart_id, a, 1).await.unwrap();
        service.add(&cart_id, b, 1).await.unwrap();

        let view = service.set_quantity(&cart_id, a, 0).await.unwrap();
        assert_eq!(view.items.len(), 1);

        let view = service.clear(&cart_id).await.unwrap();
        assert!(view.is_empty());
        assert_eq!(view.total_display, "$0");
    }
}
