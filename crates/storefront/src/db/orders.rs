//! Order (pedido) repository.
//!
//! Placing an order and changing its status both run in a single
//! transaction together with the stock adjustment they imply.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::instrument;

use pasteleria_core::{OrderStatus, PedidoId, UsuarioId};

use super::RepositoryError;
use crate::models::{NuevoPedido, Pedido, PedidoConItems, PedidoItem};

const SELECT_PEDIDO: &str = "SELECT id, usuario_id, cliente_nombre, cliente_correo, total, status, \
     payment_method, paypal_order_id, card_brand, card_last4, direccion_envio, created_at, \
     updated_at FROM pedidos";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Place an order.
    ///
    /// In one transaction: decrements stock for every line (failing if any
    /// product is short), inserts the order and its lines, and empties the
    /// cart `cart_id` when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming the product when stock is
    /// insufficient; nothing is written in that case.
    #[instrument(skip(self, pedido), fields(usuario_id = %pedido.usuario_id, items = pedido.items.len()))]
    pub async fn place(
        &self,
        pedido: &NuevoPedido,
        cart_id: Option<&str>,
    ) -> Result<Pedido, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for item in &pedido.items {
            let cantidad = i64::from(item.cantidad);
            let result = sqlx::query(
                "UPDATE pasteles SET stock = stock - ?1, updated_at = ?2 WHERE id = ?3 AND stock >= ?1",
            )
            .bind(cantidad)
            .bind(Utc::now())
            .bind(item.pastel_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::Conflict(format!(
                    "stock insuficiente para {}",
                    item.nombre
                )));
            }
        }

        let now = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO pedidos
                (usuario_id, cliente_nombre, cliente_correo, total, status, payment_method,
                 paypal_order_id, card_brand, card_last4, direccion_envio, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(pedido.usuario_id)
        .bind(&pedido.cliente_nombre)
        .bind(&pedido.cliente_correo)
        .bind(pedido.total())
        .bind(pedido.status)
        .bind(pedido.payment_method)
        .bind(&pedido.paypal_order_id)
        .bind(&pedido.card_brand)
        .bind(&pedido.card_last4)
        .bind(&pedido.direccion_envio)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "el pedido de PayPal ya fue registrado"))?;
        let pedido_id = PedidoId::new(result.last_insert_rowid());

        for item in &pedido.items {
            sqlx::query(
                "INSERT INTO pedido_items (pedido_id, pastel_id, nombre, cantidad, precio) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(pedido_id)
            .bind(item.pastel_id)
            .bind(&item.nombre)
            .bind(i64::from(item.cantidad))
            .bind(item.precio)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(cart_id) = cart_id {
            sqlx::query("DELETE FROM carrito_items WHERE carrito_id = ?")
                .bind(cart_id)
                .execute(&mut *tx)
                .await?;
        }

        let placed = fetch_in_tx(&mut tx, pedido_id).await?;
        tx.commit().await?;

        tracing::info!(pedido_id = %placed.id, total = placed.total, "Order placed");
        Ok(placed)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: PedidoId) -> Result<Option<Pedido>, RepositoryError> {
        let pedido = sqlx::query_as::<_, Pedido>(&format!("{SELECT_PEDIDO} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(pedido)
    }

    /// Get an order together with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_items(&self, id: PedidoId) -> Result<Option<PedidoConItems>, RepositoryError> {
        let Some(pedido) = self.get(id).await? else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        Ok(Some(PedidoConItems::new(pedido, items)))
    }

    /// Lines of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, id: PedidoId) -> Result<Vec<PedidoItem>, RepositoryError> {
        let items = sqlx::query_as::<_, PedidoItem>(
            "SELECT pedido_id, pastel_id, nombre, cantidad, precio FROM pedido_items WHERE pedido_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Find the order created for a PayPal order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_paypal_id(&self, paypal_order_id: &str) -> Result<Option<Pedido>, RepositoryError> {
        let pedido =
            sqlx::query_as::<_, Pedido>(&format!("{SELECT_PEDIDO} WHERE paypal_order_id = ?"))
                .bind(paypal_order_id)
                .fetch_optional(self.pool)
                .await?;
        Ok(pedido)
    }

    /// List orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Pedido>, RepositoryError> {
        let pedidos = sqlx::query_as::<_, Pedido>(&format!(
            "{SELECT_PEDIDO} WHERE (?1 IS NULL OR status = ?1) ORDER BY id DESC"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(pedidos)
    }

    /// A user's orders with their lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, usuario_id: UsuarioId) -> Result<Vec<PedidoConItems>, RepositoryError> {
        let pedidos = sqlx::query_as::<_, Pedido>(&format!(
            "{SELECT_PEDIDO} WHERE usuario_id = ? ORDER BY id DESC"
        ))
        .bind(usuario_id)
        .fetch_all(self.pool)
        .await?;

        let items = sqlx::query_as::<_, PedidoItem>(
            r"
            SELECT pi.pedido_id, pi.pastel_id, pi.nombre, pi.cantidad, pi.precio
            FROM pedido_items pi
            JOIN pedidos p ON p.id = pi.pedido_id
            WHERE p.usuario_id = ?
            ORDER BY pi.id
            ",
        )
        .bind(usuario_id)
        .fetch_all(self.pool)
        .await?;

        let mut by_pedido: HashMap<PedidoId, Vec<PedidoItem>> = HashMap::new();
        for item in items {
            by_pedido.entry(item.pedido_id).or_default().push(item);
        }

        Ok(pedidos
            .into_iter()
            .map(|pedido| {
                let items = by_pedido.remove(&pedido.id).unwrap_or_default();
                PedidoConItems::new(pedido, items)
            })
            .collect())
    }

    /// Move an order to `next`.
    ///
    /// Cancelling an order that still holds stock puts every line's quantity
    /// back on its product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist, or
    /// `RepositoryError::Conflict` if the transition is not allowed.
    #[instrument(skip(self))]
    pub async fn transition(&self, id: PedidoId, next: OrderStatus) -> Result<Pedido, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(OrderStatus,)> = sqlx::query_as("SELECT status FROM pedidos WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let (current,) = current.ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "no se puede pasar de {current} a {next}"
            )));
        }

        if next == OrderStatus::Cancelado && current.holds_stock() {
            sqlx::query(
                r"
                UPDATE pasteles SET stock = stock + (
                    SELECT SUM(pi.cantidad) FROM pedido_items pi
                    WHERE pi.pedido_id = ?1 AND pi.pastel_id = pasteles.id
                ), updated_at = ?2
                WHERE id IN (SELECT pastel_id FROM pedido_items WHERE pedido_id = ?1)
                ",
            )
            .bind(id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE pedidos SET status = ?, updated_at = ? WHERE id = ?")
            .bind(next)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let updated = fetch_in_tx(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(pedido_id = %id, from = %current, to = %next, "Order status changed");
        Ok(updated)
    }

    /// Order counts per status (statuses with no orders are included as 0).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts_by_status(&self) -> Result<Vec<(OrderStatus, i64)>, RepositoryError> {
        let rows: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM pedidos GROUP BY status")
                .fetch_all(self.pool)
                .await?;
        let counts: HashMap<OrderStatus, i64> = rows.into_iter().collect();

        Ok(OrderStatus::ALL
            .iter()
            .map(|s| (*s, counts.get(s).copied().unwrap_or(0)))
            .collect())
    }

    /// Sum of totals of orders that have been paid (pagado, enviado, entregado).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn paid_revenue(&self) -> Result<i64, RepositoryError> {
        let (revenue,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(total), 0) FROM pedidos WHERE status IN ('pagado', 'enviado', 'entregado')",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(revenue)
    }
}

async fn fetch_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: PedidoId,
) -> Result<Pedido, RepositoryError> {
    sqlx::query_as::<_, Pedido>(&format!("{SELECT_PEDIDO} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(RepositoryError::NotFound)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{ProductRepository, memory_pool};
    use crate::models::{NuevoPedidoItem, PastelInput};
    use pasteleria_core::{PastelId, PaymentMethod};

    async fn setup() -> (SqlitePool, PastelId) {
        let pool = memory_pool().await.unwrap();
        sqlx::query(
            "INSERT INTO usuarios (nombre, apellido, correo, password_hash, created_at, updated_at) \
             VALUES ('Ana', 'Pérez', 'ana@duoc.cl', 'x', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let pastel = ProductRepository::new(&pool)
            .create(&PastelInput {
                nombre: "Torta Circular de Manjar".to_string(),
                descripcion: String::new(),
                precio: 42_000,
                stock: 5,
                stock_critico: 1,
                categoria_id: None,
                imagen: None,
            })
            .await
            .unwrap();
        (pool, pastel.id)
    }

    fn pedido(pastel_id: PastelId, cantidad: u32, status: OrderStatus) -> NuevoPedido {
        NuevoPedido {
            usuario_id: UsuarioId::new(1),
            cliente_nombre: "Ana Pérez".to_string(),
            cliente_correo: "ana@duoc.cl".to_string(),
            status,
            payment_method: PaymentMethod::Tarjeta,
            paypal_order_id: None,
            card_brand: Some("visa".to_string()),
            card_last4: Some("1111".to_string()),
            direccion_envio: None,
            items: vec![NuevoPedidoItem {
                pastel_id,
                nombre: "Torta Circular de Manjar".to_string(),
                cantidad,
                precio: 42_000,
            }],
        }
    }

    async fn stock(pool: &SqlitePool, id: PastelId) -> i64 {
        ProductRepository::new(pool).get(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_place_decrements_stock() {
        let (pool, pastel_id) = setup().await;
        let orders = OrderRepository::new(&pool);

        let placed = orders.place(&pedido(pastel_id, 2, OrderStatus::Pagado), None).await.unwrap();
        assert_eq!(placed.total, 84_000);
        assert_eq!(placed.status, OrderStatus::Pagado);
        assert_eq!(stock(&pool, pastel_id).await, 3);

        let with_items = orders.get_with_items(placed.id).await.unwrap().unwrap();
        assert_eq!(with_items.items.len(), 1);
        assert_eq!(with_items.total_display, "$84.000");
    }

    #[tokio::test]
    async fn test_place_rejects_insufficient_stock_atomically() {
        let (pool, pastel_id) = setup().await;
        let orders = OrderRepository::new(&pool);

        let err = orders
            .place(&pedido(pastel_id, 6, OrderStatus::Pagado), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg.contains("Torta Circular de Manjar")));
        assert_eq!(stock(&pool, pastel_id).await, 5);
        assert!(orders.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        let (pool, pastel_id) = setup().await;
        let orders = OrderRepository::new(&pool);
        let placed = orders.place(&pedido(pastel_id, 2, OrderStatus::Pagado), None).await.unwrap();

        let cancelled = orders.transition(placed.id, OrderStatus::Cancelado).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelado);
        assert_eq!(stock(&pool, pastel_id).await, 5);

        let err = orders.transition(placed.id, OrderStatus::Cancelado).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(stock(&pool, pastel_id).await, 5);
    }

    #[tokio::test]
    async fn test_transitions_and_summary() {
        let (pool, pastel_id) = setup().await;
        let orders = OrderRepository::new(&pool);
        let placed = orders.place(&pedido(pastel_id, 1, OrderStatus::Pagado), None).await.unwrap();

        assert!(matches!(
            orders.transition(placed.id, OrderStatus::Entregado).await.unwrap_err(),
            RepositoryError::Conflict(_)
        ));
        orders.transition(placed.id, OrderStatus::Enviado).await.unwrap();
        orders.transition(placed.id, OrderStatus::Entregado).await.unwrap();

        assert!(matches!(
            orders.transition(PedidoId::new(42), OrderStatus::Pagado).await.unwrap_err(),
            RepositoryError::NotFound
        ));

        let counts = orders.counts_by_status().await.unwrap();
        assert_eq!(counts.len(), 5);
        assert!(counts.contains(&(OrderStatus::Entregado, 1)));
        assert!(counts.contains(&(OrderStatus::Pendiente, 0)));
        assert_eq!(orders.paid_revenue().await.unwrap(), 42_000);

        let mine = orders.list_for_user(UsuarioId::new(1)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].items.len(), 1);
    }
}
