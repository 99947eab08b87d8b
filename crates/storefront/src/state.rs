//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;
use url::Url;

use crate::config::StorefrontConfig;
use crate::events::CartEvents;
use crate::paypal::{PayPalClient, PayPalError};
use crate::services::{CartService, CatalogCache, CheckoutService};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid base_url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid PAYPAL_API_BASE: {0}")]
    InvalidPayPalBase(url::ParseError),
    #[error("paypal client error: {0}")]
    PayPal(#[from] PayPalError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: SqlitePool,
    paypal: PayPalClient,
    cart_events: CartEvents,
    catalog: CatalogCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - SQLite connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if a configured URL is malformed or the PayPal HTTP
    /// client cannot be built.
    pub fn new(config: StorefrontConfig, pool: SqlitePool) -> Result<Self, StateError> {
        Url::parse(&config.base_url)?;
        Url::parse(&config.paypal.api_base).map_err(StateError::InvalidPayPalBase)?;

        let paypal = PayPalClient::new(config.paypal.clone())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                paypal,
                cart_events: CartEvents::new(),
                catalog: CatalogCache::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the PayPal client.
    #[must_use]
    pub fn paypal(&self) -> &PayPalClient {
        &self.inner.paypal
    }

    /// Get a reference to the cart change hub.
    #[must_use]
    pub fn cart_events(&self) -> &CartEvents {
        &self.inner.cart_events
    }

    /// Get a reference to the catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Cart service bound to this state.
    #[must_use]
    pub fn cart_service(&self) -> CartService<'_> {
        CartService::new(self.pool(), self.cart_events())
    }

    /// Checkout service bound to this state.
    #[must_use]
    pub fn checkout_service(&self) -> CheckoutService<'_> {
        CheckoutService::new(
            self.pool(),
            self.paypal(),
            self.cart_events(),
            self.catalog(),
            self.config().clp_usd_rate,
        )
    }
}
