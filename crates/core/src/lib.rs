//! Pastelería Core - Shared domain library.
//!
//! This crate provides the domain types and pure business rules used by
//! every Pastelería component:
//! - `storefront` - JSON API server (catalog, cart, checkout, back-office)
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and easy to test.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses
//! - [`cart`] - Cart arithmetic with stock clamping
//! - [`payment`] - Card payment simulation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod payment;
pub mod types;

pub use cart::{Cart, CartError, CartLine};
pub use payment::{CardAuthorization, CardBrand, CardDetails, CardError};
pub use types::*;
