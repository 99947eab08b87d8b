//! PayPal REST API client.
//!
//! Covers the three calls checkout needs:
//!
//! 1. `POST /v1/oauth2/token` - client-credentials OAuth
//! 2. `POST /v2/checkout/orders` - create an order (intent `CAPTURE`)
//! 3. `POST /v2/checkout/orders/{id}/capture` - capture an approved order
//!
//! # Architecture
//!
//! - Access tokens are cached in memory until 60 s before expiry
//! - No retries; a non-2xx answer becomes [`PayPalError::Upstream`] carrying
//!   PayPal's status and body so routes can relay them verbatim
//! - Catalog prices are CLP, which PayPal does not settle; request bodies are
//!   built in USD using the configured CLP-per-USD rate

pub mod auth;
pub mod client;
pub mod types;

pub use client::PayPalClient;
pub use types::{LineItem, PayPalOrder};

use thiserror::Error;

use pasteleria_core::PriceError;

/// Errors that can occur when interacting with the PayPal API.
#[derive(Debug, Error)]
pub enum PayPalError {
    /// HTTP request failed before PayPal answered.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// PayPal answered with a non-success status.
    #[error("PayPal returned HTTP {status}")]
    Upstream {
        /// HTTP status from PayPal.
        status: u16,
        /// Raw response body from PayPal.
        body: String,
    },

    /// PayPal answered 2xx with a body we could not read.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Amount conversion failed.
    #[error("price conversion error: {0}")]
    Price(#[from] PriceError),

    /// The request cannot be sent as given.
    #[error("invalid PayPal request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display() {
        let err = PayPalError::Upstream {
            status: 422,
            body: r#"{"name":"UNPROCESSABLE_ENTITY"}"#.to_string(),
        };
        assert_eq!(err.to_string(), "PayPal returned HTTP 422");
    }

    #[test]
    fn test_invalid_request_display() {
        let err = PayPalError::InvalidRequest("total must be positive".to_string());
        assert_eq!(err.to_string(), "invalid PayPal request: total must be positive");
    }
}
