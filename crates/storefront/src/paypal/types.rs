//! PayPal Orders v2 request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pasteleria_core::{CurrencyCode, Price};

use super::PayPalError;

/// PayPal rejects item names longer than this.
const MAX_ITEM_NAME: usize = 127;

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /v2/checkout/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub intent: &'static str,
    pub purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseUnit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub amount: Amount,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Amount {
    pub currency_code: &'static str,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Breakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Breakdown {
    pub item_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Money {
    pub currency_code: &'static str,
    pub value: String,
}

impl From<Price> for Money {
    fn from(price: Price) -> Self {
        Self {
            currency_code: price.currency_code.code(),
            value: price.to_provider_value(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub name: String,
    pub quantity: String,
    pub unit_amount: Money,
}

/// A line to bill, priced in its own currency.
#[derive(Debug, Clone)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Price,
}

impl CreateOrderRequest {
    /// Build a capture order billed in USD.
    ///
    /// With `items`, each unit price is converted and the order amount is the
    /// sum of the converted lines, so PayPal's `item_total` check always
    /// holds. Without items, `total` is converted directly.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::InvalidRequest` for a non-positive amount or a
    /// zero quantity, and `PayPalError::Price` for a bad exchange rate.
    pub fn usd(
        total: Price,
        items: &[LineItem],
        clp_per_usd: Decimal,
        reference_id: Option<String>,
    ) -> Result<Self, PayPalError> {
        let mut converted = Vec::with_capacity(items.len());
        let mut item_total = Decimal::ZERO;
        for item in items {
            if item.quantity == 0 {
                return Err(PayPalError::InvalidRequest(format!(
                    "quantity for {} must be at least 1",
                    item.name
                )));
            }
            let unit = item.unit_price.to_usd(clp_per_usd)?;
            item_total += unit.amount * Decimal::from(item.quantity);
            converted.push(Item {
                name: item.name.chars().take(MAX_ITEM_NAME).collect(),
                quantity: item.quantity.to_string(),
                unit_amount: Money::from(unit),
            });
        }

        let amount = if converted.is_empty() {
            total.to_usd(clp_per_usd)?
        } else {
            Price::new(item_total, CurrencyCode::USD)
        };
        if amount.amount <= Decimal::ZERO {
            return Err(PayPalError::InvalidRequest(
                "order total must be greater than zero".to_string(),
            ));
        }

        let money = Money::from(amount);
        let breakdown = (!converted.is_empty()).then(|| Breakdown {
            item_total: money.clone(),
        });

        Ok(Self {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnit {
                reference_id,
                amount: Amount {
                    currency_code: money.currency_code,
                    value: money.value,
                    breakdown,
                },
                items: converted,
            }],
        })
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Fields we read from an order or capture response.
#[derive(Debug, Clone, Deserialize)]
struct OrderFields {
    id: String,
    #[serde(default)]
    status: String,
}

/// A successful PayPal order response.
///
/// Keeps the full JSON body so it can be relayed to the browser unchanged.
#[derive(Debug, Clone)]
pub struct PayPalOrder {
    /// HTTP status PayPal answered with (200 or 201).
    pub http_status: u16,
    /// PayPal order ID.
    pub id: String,
    /// Order status (`CREATED`, `COMPLETED`, ...).
    pub status: String,
    /// Raw response body.
    pub body: serde_json::Value,
}

impl PayPalOrder {
    /// Parse a 2xx response body.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::Parse` if the body is not an order object.
    pub fn from_body(http_status: u16, body: serde_json::Value) -> Result<Self, PayPalError> {
        let fields: OrderFields = serde_json::from_value(body.clone())?;
        Ok(Self {
            http_status,
            id: fields.id,
            status: fields.status,
            body,
        })
    }

    /// Whether a capture completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETED")
    }
}
