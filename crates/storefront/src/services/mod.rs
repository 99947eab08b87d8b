//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `cart` - Cart operations with stock clamping and change events
//! - `catalog` - Cached catalog reads
//! - `checkout` - Order placement, card simulation and PayPal

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

pub use auth::{AuthError, AuthService, Registro};
pub use cart::{CartService, CartServiceError, CartView};
pub use catalog::CatalogCache;
pub use checkout::{CheckoutError, CheckoutOutcome, CheckoutRequest, CheckoutService};
