//! Order receipt ("boleta") handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use pasteleria_core::{PedidoId, Price};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::PedidoConItems;
use crate::state::AppState;

/// A receipt line, formatted for display.
pub struct BoletaLine {
    pub nombre: String,
    pub cantidad: i64,
    pub precio: String,
    pub subtotal: String,
}

/// Printable receipt for a pedido.
#[derive(Template, WebTemplate)]
#[template(path = "boleta.html")]
pub struct BoletaTemplate {
    pub numero: String,
    pub fecha: String,
    pub cliente_nombre: String,
    pub cliente_correo: String,
    pub direccion_envio: String,
    pub estado: String,
    pub medio_pago: String,
    pub lines: Vec<BoletaLine>,
    pub total: String,
}

impl From<&PedidoConItems> for BoletaTemplate {
    fn from(order: &PedidoConItems) -> Self {
        let pedido = &order.pedido;
        let medio_pago = match (&pedido.card_brand, &pedido.card_last4) {
            (Some(brand), Some(last4)) => format!("Tarjeta {brand} **** {last4}"),
            _ => pedido.payment_method.to_string(),
        };

        Self {
            numero: format!("{:06}", pedido.id.as_i64()),
            fecha: pedido.created_at.format("%d-%m-%Y %H:%M").to_string(),
            cliente_nombre: pedido.cliente_nombre.clone(),
            cliente_correo: pedido.cliente_correo.clone(),
            direccion_envio: pedido
                .direccion_envio
                .clone()
                .unwrap_or_else(|| "Retiro en tienda".to_string()),
            estado: pedido.status.to_string(),
            medio_pago,
            lines: order
                .items
                .iter()
                .map(|item| BoletaLine {
                    nombre: item.nombre.clone(),
                    cantidad: item.cantidad,
                    precio: Price::clp(item.precio).display(),
                    subtotal: Price::clp(item.subtotal()).display(),
                })
                .collect(),
            total: order.total_display.clone(),
        }
    }
}

/// `GET /api/orders/{id}/boleta`
///
/// Visible to the customer who placed the order and to staff.
#[instrument(skip(state, user), fields(usuario_id = %user.id))]
pub async fn boleta(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PedidoId>,
) -> Result<BoletaTemplate> {
    let order = OrderRepository::new(state.pool())
        .get_with_items(id)
        .await?
        .ok_or_else(|| AppError::NotFound("pedido no encontrado".to_string()))?;

    if order.pedido.usuario_id != Some(user.id) && !user.role.is_staff() {
        return Err(AppError::Forbidden(
            "no tienes permisos para ver este pedido".to_string(),
        ));
    }

    Ok(BoletaTemplate::from(&order))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{Pedido, PedidoItem};
    use pasteleria_core::{OrderStatus, PastelId, PaymentMethod, UsuarioId};

    fn order() -> PedidoConItems {
        let now = Utc::now();
        PedidoConItems::new(
            Pedido {
                id: PedidoId::new(42),
                usuario_id: Some(UsuarioId::new(1)),
                cliente_nombre: "María González".to_string(),
                cliente_correo: "maria@duoc.cl".to_string(),
                total: 90_000,
                status: OrderStatus::Pagado,
                payment_method: PaymentMethod::Tarjeta,
                paypal_order_id: None,
                card_brand: Some("visa".to_string()),
                card_last4: Some("4242".to_string()),
                direccion_envio: None,
                created_at: now,
                updated_at: now,
            },
            vec![PedidoItem {
                pedido_id: PedidoId::new(42),
                pastel_id: Some(PastelId::new(3)),
                nombre: "Torta Cuadrada de Frutas".to_string(),
                cantidad: 2,
                precio: 45_000,
            }],
        )
    }

    #[test]
    fn test_boleta_renders_lines_and_total() {
        let html = BoletaTemplate::from(&order()).render().unwrap();

        assert!(html.contains("000042"));
        assert!(html.contains("Torta Cuadrada de Frutas"));
        assert!(html.contains("$90.000"));
        assert!(html.contains("Tarjeta visa **** 4242"));
        assert!(html.contains("Retiro en tienda"));
    }

    #[test]
    fn test_boleta_escapes_customer_text() {
        let mut order = order();
        order.pedido.cliente_nombre = "<script>alert(1)</script>".to_string();
        let html = BoletaTemplate::from(&order).render().unwrap();
        assert!(!html.contains("<script>"));
    }
}
