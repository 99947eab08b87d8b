//! Order (pedido) types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pasteleria_core::{OrderStatus, PastelId, PaymentMethod, PedidoId, Price, UsuarioId};

/// A stored order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Pedido {
    pub id: PedidoId,
    pub usuario_id: Option<UsuarioId>,
    pub cliente_nombre: String,
    pub cliente_correo: String,
    /// Total in whole Chilean pesos.
    pub total: i64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub paypal_order_id: Option<String>,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub direccion_envio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pedido {
    /// Formatted total (e.g. "$45.000").
    #[must_use]
    pub fn total_display(&self) -> String {
        Price::clp(self.total).display()
    }
}

/// A line of a stored order, priced at purchase time.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PedidoItem {
    pub pedido_id: PedidoId,
    /// `None` once the product has been deleted from the catalog.
    pub pastel_id: Option<PastelId>,
    pub nombre: String,
    pub cantidad: i64,
    /// Unit price in whole Chilean pesos.
    pub precio: i64,
}

impl PedidoItem {
    /// Unit price times quantity.
    #[must_use]
    pub const fn subtotal(&self) -> i64 {
        self.precio.saturating_mul(self.cantidad)
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct PedidoConItems {
    #[serde(flatten)]
    pub pedido: Pedido,
    pub total_display: String,
    pub items: Vec<PedidoItem>,
}

impl PedidoConItems {
    #[must_use]
    pub fn new(pedido: Pedido, items: Vec<PedidoItem>) -> Self {
        Self {
            total_display: pedido.total_display(),
            pedido,
            items,
        }
    }
}

/// Data for a new order.
#[derive(Debug, Clone)]
pub struct NuevoPedido {
    pub usuario_id: UsuarioId,
    pub cliente_nombre: String,
    pub cliente_correo: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub paypal_order_id: Option<String>,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub direccion_envio: Option<String>,
    pub items: Vec<NuevoPedidoItem>,
}

impl NuevoPedido {
    /// Sum of line subtotals.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.items
            .iter()
            .map(|i| i.precio.saturating_mul(i64::from(i.cantidad)))
            .fold(0, i64::saturating_add)
    }
}

/// A line of a new order.
#[derive(Debug, Clone)]
pub struct NuevoPedidoItem {
    pub pastel_id: PastelId,
    pub nombre: String,
    pub cantidad: u32,
    pub precio: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nuevo_pedido_total() {
        let pedido = NuevoPedido {
            usuario_id: UsuarioId::new(1),
            cliente_nombre: "María González".to_string(),
            cliente_correo: "maria@duoc.cl".to_string(),
            status: OrderStatus::Pagado,
            payment_method: PaymentMethod::Tarjeta,
            paypal_order_id: None,
            card_brand: None,
            card_last4: None,
            direccion_envio: None,
            items: vec![
                NuevoPedidoItem {
                    pastel_id: PastelId::new(1),
                    nombre: "Torta Circular de Manjar".to_string(),
                    cantidad: 2,
                    precio: 42_000,
                },
                NuevoPedidoItem {
                    pastel_id: PastelId::new(2),
                    nombre: "Mousse de Chocolate".to_string(),
                    cantidad: 3,
                    precio: 5_000,
                },
            ],
        };

        assert_eq!(pedido.total(), 99_000);
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let line = |precio| NuevoPedidoItem {
            pastel_id: PastelId::new(1),
            nombre: "Torta Gigante".to_string(),
            cantidad: u32::MAX,
            precio,
        };
        let pedido = NuevoPedido {
            usuario_id: UsuarioId::new(1),
            cliente_nombre: "María González".to_string(),
            cliente_correo: "maria@duoc.cl".to_string(),
            status: OrderStatus::Pendiente,
            payment_method: PaymentMethod::Paypal,
            paypal_order_id: None,
            card_brand: None,
            card_last4: None,
            direccion_envio: None,
            items: vec![line(i64::MAX), line(i64::MAX / 2)],
        };
        assert_eq!(pedido.total(), i64::MAX);

        let item = PedidoItem {
            pedido_id: PedidoId::new(1),
            pastel_id: None,
            nombre: "Torta Gigante".to_string(),
            cantidad: 3,
            precio: i64::MAX / 2,
        };
        assert_eq!(item.subtotal(), i64::MAX);
    }
}
