//! Checkout: turning a cart into a pedido.
//!
//! Card payments are simulated and settle immediately (`pagado`). PayPal
//! payments create the PayPal order first, then store a `pendiente` pedido
//! carrying its id; the pedido becomes `pagado` when the capture completes.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use pasteleria_core::payment::validate_card;
use pasteleria_core::{CardDetails, CardError, OrderStatus, PaymentMethod, Price};

use crate::db::{OrderRepository, RepositoryError, UserRepository};
use crate::events::CartEvents;
use crate::models::{CurrentUser, NuevoPedido, NuevoPedidoItem, PedidoConItems};
use crate::paypal::types::CreateOrderRequest;
use crate::paypal::{LineItem, PayPalClient, PayPalError, PayPalOrder};
use crate::services::cart::{CartService, CartServiceError, CartView};
use crate::services::catalog::CatalogCache;

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("el carrito está vacío")]
    EmptyCart,

    #[error("faltan los datos de la tarjeta")]
    MissingCard,

    #[error(transparent)]
    Card(#[from] CardError),

    #[error(transparent)]
    PayPal(#[from] PayPalError),

    #[error(transparent)]
    Cart(#[from] CartServiceError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// `POST /api/checkout` payload.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub direccion_envio: Option<String>,
    #[serde(default)]
    pub card: Option<CardDetails>,
}

/// Result of a checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutOutcome {
    pub pedido: PedidoConItems,
    /// PayPal order JSON (with approval links) for PayPal checkouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal: Option<serde_json::Value>,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a SqlitePool,
    paypal: &'a PayPalClient,
    events: &'a CartEvents,
    catalog: &'a CatalogCache,
    clp_per_usd: Decimal,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a SqlitePool,
        paypal: &'a PayPalClient,
        events: &'a CartEvents,
        catalog: &'a CatalogCache,
        clp_per_usd: Decimal,
    ) -> Self {
        Self {
            pool,
            paypal,
            events,
            catalog,
            clp_per_usd,
        }
    }

    /// Place an order for the contents of `cart_id`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart`, `MissingCard` or `Card` for bad input (nothing is
    /// written), `Repository(Conflict)` when stock ran out, and `PayPal` when
    /// PayPal rejects the order.
    #[instrument(skip(self, user, request), fields(usuario_id = %user.id, method = ?request.payment_method))]
    pub async fn checkout(
        &self,
        user: &CurrentUser,
        cart_id: &str,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let view = CartService::new(self.pool, self.events).view(cart_id).await?;
        if view.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let usuario = UserRepository::new(self.pool)
            .get_by_id(user.id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let direccion_envio = request
            .direccion_envio
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(ToString::to_string)
            .or_else(|| usuario.direccion.clone());

        let mut pedido = NuevoPedido {
            usuario_id: usuario.id,
            cliente_nombre: usuario.nombre_completo(),
            cliente_correo: usuario.correo.to_string(),
            status: OrderStatus::Pendiente,
            payment_method: request.payment_method,
            paypal_order_id: None,
            card_brand: None,
            card_last4: None,
            direccion_envio,
            items: order_items(&view),
        };

        let mut paypal_body = None;
        match request.payment_method {
            PaymentMethod::Tarjeta => {
                let card = request.card.as_ref().ok_or(CheckoutError::MissingCard)?;
                let authorization = validate_card(card, Utc::now().date_naive())?;
                pedido.status = OrderStatus::Pagado;
                pedido.card_brand = Some(authorization.brand.as_str().to_string());
                pedido.card_last4 = Some(authorization.last4);
            }
            PaymentMethod::Paypal => {
                let lines: Vec<LineItem> = pedido
                    .items
                    .iter()
                    .map(|i| LineItem {
                        name: i.nombre.clone(),
                        quantity: i.cantidad,
                        unit_price: Price::clp(i.precio),
                    })
                    .collect();
                let body = CreateOrderRequest::usd(
                    Price::clp(pedido.total()),
                    &lines,
                    self.clp_per_usd,
                    None,
                )?;
                let order = self.paypal.create_order(&body).await?;
                pedido.paypal_order_id = Some(order.id);
                paypal_body = Some(order.body);
            }
        }

        let placed = match OrderRepository::new(self.pool).place(&pedido, Some(cart_id)).await {
            Ok(placed) => placed,
            Err(err) => {
                if let Some(paypal_order_id) = &pedido.paypal_order_id {
                    tracing::warn!(paypal_order_id = %paypal_order_id, error = %err, "PayPal order abandoned, local order failed");
                }
                return Err(err.into());
            }
        };

        self.events.publish(cart_id, 0);
        self.catalog.invalidate_all().await;

        let items = OrderRepository::new(self.pool).items(placed.id).await?;
        Ok(CheckoutOutcome {
            pedido: PedidoConItems::new(placed, items),
            paypal: paypal_body,
        })
    }

    /// Create a PayPal order for an arbitrary total (pass-through endpoint).
    ///
    /// # Errors
    ///
    /// Returns `PayPal` if the amount is invalid or PayPal rejects it.
    pub async fn create_paypal_order(
        &self,
        total: Price,
        items: &[LineItem],
    ) -> Result<PayPalOrder, CheckoutError> {
        let body = CreateOrderRequest::usd(total, items, self.clp_per_usd, None)?;
        Ok(self.paypal.create_order(&body).await?)
    }

    /// Capture a PayPal order and mark the matching pedido paid.
    ///
    /// # Errors
    ///
    /// Returns `PayPal` if PayPal rejects the capture.
    #[instrument(skip(self))]
    pub async fn capture_paypal_order(&self, paypal_order_id: &str) -> Result<PayPalOrder, CheckoutError> {
        let capture = self.paypal.capture_order(paypal_order_id).await?;
        if !capture.is_completed() {
            return Ok(capture);
        }

        let orders = OrderRepository::new(self.pool);
        if let Some(pedido) = orders.find_by_paypal_id(paypal_order_id).await? {
            if pedido.status == OrderStatus::Pendiente {
                orders.transition(pedido.id, OrderStatus::Pagado).await?;
            } else {
                tracing::info!(pedido_id = %pedido.id, status = %pedido.status, "Capture for an order that is no longer pending");
            }
        }
        Ok(capture)
    }
}

fn order_items(view: &CartView) -> Vec<NuevoPedidoItem> {
    view.items
        .iter()
        .map(|item| NuevoPedidoItem {
            pastel_id: item.id,
            nombre: item.nombre.clone(),
            cantidad: item.cantidad,
            precio: item.precio,
        })
        .collect()
}
