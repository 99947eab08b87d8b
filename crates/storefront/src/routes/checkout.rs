//! Checkout and PayPal route handlers.
//!
//! `/api/checkout` turns the session's cart into a pedido. `/api/create-order`
//! and `/api/capture-order` are thin PayPal pass-throughs for the SPA's
//! PayPal buttons; they answer with PayPal's own status and JSON.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use pasteleria_core::{CurrencyCode, Price};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::paypal::{LineItem, PayPalOrder};
use crate::routes::cart::existing_cart_id;
use crate::services::{CheckoutError, CheckoutRequest};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// `POST /api/create-order` body.
#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub total: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub items: Vec<CreateOrderItem>,
}

/// A line of `POST /api/create-order`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderItem {
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(alias = "cantidad")]
    pub quantity: u32,
    #[serde(alias = "precio")]
    pub price: Decimal,
}

/// `POST /api/capture-order` body.
#[derive(Debug, Deserialize)]
pub struct CaptureOrderBody {
    #[serde(rename = "orderID")]
    pub order_id: String,
}

impl CreateOrderBody {
    fn currency(&self) -> Result<CurrencyCode> {
        match self.currency.as_deref() {
            None => Ok(CurrencyCode::CLP),
            Some(code) => CurrencyCode::from_code(code)
                .ok_or_else(|| AppError::BadRequest(format!("moneda no soportada: {code}"))),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/checkout`
#[instrument(skip_all, fields(usuario_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse> {
    let cart_id = existing_cart_id(&state, &session, Some(&user))
        .await?
        .ok_or(CheckoutError::EmptyCart)?;

    let outcome = state
        .checkout_service()
        .checkout(&user, &cart_id, &request)
        .await?;

    tracing::info!(
        pedido_id = %outcome.pedido.pedido.id,
        total = outcome.pedido.pedido.total,
        status = %outcome.pedido.pedido.status,
        "Order placed"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `POST /api/create-order`
#[instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderBody>,
) -> Result<Response> {
    let currency = body.currency()?;
    let items: Vec<LineItem> = body
        .items
        .iter()
        .map(|item| LineItem {
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: Price::new(item.price, currency),
        })
        .collect();

    let order = state
        .checkout_service()
        .create_paypal_order(Price::new(body.total, currency), &items)
        .await?;
    Ok(relay(order))
}

/// `POST /api/capture-order`
#[instrument(skip_all, fields(paypal_order_id = %body.order_id))]
pub async fn capture_order(
    State(state): State<AppState>,
    Json(body): Json<CaptureOrderBody>,
) -> Result<Response> {
    let order = state
        .checkout_service()
        .capture_paypal_order(&body.order_id)
        .await?;
    Ok(relay(order))
}

/// Answer with PayPal's status and body.
fn relay(order: PayPalOrder) -> Response {
    let status = StatusCode::from_u16(order.http_status).unwrap_or(StatusCode::OK);
    (status, Json(order.body)).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_accepts_spanish_item_keys() {
        let body: CreateOrderBody = serde_json::from_str(
            r#"{"total": 50000, "items": [{"nombre": "Tiramisú Clásico", "cantidad": 2, "precio": 25000}]}"#,
        )
        .unwrap();
        assert_eq!(body.currency().unwrap(), CurrencyCode::CLP);
        assert_eq!(body.items[0].quantity, 2);
        assert_eq!(body.items[0].price, Decimal::from(25_000));
    }

    #[test]
    fn test_unknown_currency_is_rejected() {
        let body: CreateOrderBody =
            serde_json::from_str(r#"{"total": "10.00", "currency": "EUR"}"#).unwrap();
        assert!(matches!(body.currency(), Err(AppError::BadRequest(_))));
    }
}
