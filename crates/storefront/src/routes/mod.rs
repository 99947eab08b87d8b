//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Liveness text
//!
//! # Catalog
//! GET  /api/products?categoria=&q=    - Product listing
//! GET  /api/products/{id}             - Product detail
//! GET  /api/products/slug/{slug}      - Product detail by slug
//! GET  /api/categories                - Categories with product counts
//!
//! # Cart (session or account)
//! GET    /api/cart                    - Cart view
//! GET    /api/cart/count              - Unit count
//! GET    /api/cart/events             - SSE stream of cartUpdated
//! POST   /api/cart/items              - Add product
//! PUT    /api/cart/items/{pastel_id}  - Set quantity (0 removes)
//! DELETE /api/cart/items/{pastel_id}  - Remove line
//! DELETE /api/cart                    - Clear
//!
//! # Auth (rate limited)
//! POST /api/auth/register             - Create customer account and log in
//! POST /api/auth/login                - Log in
//! POST /api/auth/logout               - Log out
//! GET  /api/auth/me                   - Current user
//!
//! # Account (requires auth)
//! PUT  /api/account                   - Update profile
//! GET  /api/account/orders            - Own orders
//! GET  /api/orders/{id}/boleta        - HTML receipt (owner or staff)
//!
//! # Checkout & PayPal
//! POST /api/checkout                  - Place order from cart (requires auth)
//! POST /api/create-order              - Create PayPal order
//! POST /api/capture-order             - Capture PayPal order
//!
//! # Contact
//! POST /api/contact                   - Contact form
//!
//! # Back-office
//! /api/admin/...                      - See `admin`
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod contact;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::state::AppState;

/// Text answered at `/`.
pub const HOME_TEXT: &str = "API Pastelería funcionando";

async fn home() -> &'static str {
    HOME_TEXT
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list))
        .route("/products/{id}", get(products::show))
        .route("/products/slug/{slug}", get(products::show_by_slug))
        .route("/categories", get(products::categories))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/count", get(cart::count))
        .route("/events", get(cart::events))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{pastel_id}",
            put(cart::set_quantity).delete(cart::remove_item),
        )
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", put(account::update))
        .route("/orders", get(account::orders))
}

/// Create all routes for the storefront.
///
/// `auth_limiter` guards `/api/auth/*`.
pub fn routes(auth_limiter: RateLimiterLayer) -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/auth", auth_routes().layer(auth_limiter))
        .nest("/account", account_routes())
        .route("/orders/{id}/boleta", get(orders::boleta))
        .route("/checkout", post(checkout::checkout))
        .route("/create-order", post(checkout::create_order))
        .route("/capture-order", post(checkout::capture_order))
        .route("/contact", post(contact::submit))
        .nest("/admin", admin::routes());

    Router::new().route("/", get(home)).nest("/api", api)
}
