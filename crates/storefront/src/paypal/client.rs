//! PayPal Orders API client.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::instrument;

use super::PayPalError;
use super::auth::{AccessToken, request_token};
use super::types::{CreateOrderRequest, PayPalOrder};
use crate::config::PayPalConfig;

/// PayPal REST API client.
///
/// Cheap to clone; clones share the HTTP client and the cached token.
#[derive(Clone)]
pub struct PayPalClient {
    inner: Arc<PayPalClientInner>,
}

struct PayPalClientInner {
    client: reqwest::Client,
    config: PayPalConfig,
    /// In-memory token cache
    token: RwLock<Option<AccessToken>>,
}

impl PayPalClient {
    /// Create a new client for the configured environment.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::Http` if the HTTP client cannot be built.
    pub fn new(config: PayPalConfig) -> Result<Self, PayPalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(PayPalClientInner {
                client,
                config,
                token: RwLock::new(None),
            }),
        })
    }

    /// API base URL this client talks to.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.inner.config.api_base
    }

    /// A valid access token, fetching a new one when the cached one is
    /// missing or about to expire.
    async fn access_token(&self) -> Result<SecretString, PayPalError> {
        if let Some(token) = self.inner.token.read().await.as_ref()
            && !token.is_expired()
        {
            return Ok(token.access_token.clone());
        }

        let mut slot = self.inner.token.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = slot.as_ref()
            && !token.is_expired()
        {
            return Ok(token.access_token.clone());
        }

        let token = request_token(&self.inner.client, &self.inner.config).await?;
        let access_token = token.access_token.clone();
        *slot = Some(token);
        Ok(access_token)
    }

    /// Create an order.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::Upstream` with PayPal's status and body on a
    /// non-2xx answer.
    #[instrument(skip_all)]
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<PayPalOrder, PayPalError> {
        let token = self.access_token().await?;
        let response = self
            .inner
            .client
            .post(format!("{}/v2/checkout/orders", self.api_base()))
            .bearer_auth(token.expose_secret())
            .json(request)
            .send()
            .await?;

        let order = read_order(response).await?;
        tracing::info!(paypal_order_id = %order.id, status = %order.status, "PayPal order created");
        Ok(order)
    }

    /// Capture an approved order.
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::Upstream` with PayPal's status and body on a
    /// non-2xx answer.
    #[instrument(skip(self))]
    pub async fn capture_order(&self, order_id: &str) -> Result<PayPalOrder, PayPalError> {
        if order_id.is_empty() || !order_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(PayPalError::InvalidRequest("invalid orderID".to_string()));
        }

        let token = self.access_token().await?;
        let response = self
            .inner
            .client
            .post(format!("{}/v2/checkout/orders/{order_id}/capture", self.api_base()))
            .bearer_auth(token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let order = read_order(response).await?;
        tracing::info!(paypal_order_id = %order.id, status = %order.status, "PayPal order captured");
        Ok(order)
    }
}

async fn read_order(response: reqwest::Response) -> Result<PayPalOrder, PayPalError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "PayPal API returned non-success status"
        );
        return Err(PayPalError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    PayPalOrder::from_body(status.as_u16(), serde_json::from_str(&body)?)
}

impl std::fmt::Debug for PayPalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalClient")
            .field("api_base", &self.inner.config.api_base)
            .finish_non_exhaustive()
    }
}
