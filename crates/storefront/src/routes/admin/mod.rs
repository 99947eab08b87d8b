//! Back-office API, mounted under `/api/admin`.
//!
//! Staff (`admin` or `vendedor`) can read everything here. Only `admin` can
//! change the catalog or accounts; `vendedor` may also move orders through
//! their lifecycle.
//!
//! ```text
//! GET    /products               - All products (staff)
//! GET    /products/critical      - Products at or below critical stock (staff)
//! POST   /products               - Create product (admin)
//! PUT    /products/{id}          - Update product (admin)
//! DELETE /products/{id}          - Delete product (admin)
//!
//! GET    /categories             - Categories with product counts (admin)
//! POST   /categories             - Create category (admin)
//! PUT    /categories/{id}        - Update category (admin)
//! DELETE /categories/{id}        - Delete empty category (admin)
//!
//! GET    /users                  - All accounts (admin)
//! POST   /users                  - Create account with role (admin)
//! GET    /users/{id}             - Account detail (admin)
//! PUT    /users/{id}             - Update account (admin)
//! DELETE /users/{id}             - Delete account (admin)
//!
//! GET    /orders?status=         - Orders, newest first (staff)
//! GET    /orders/{id}            - Order with lines (staff)
//! PUT    /orders/{id}/status     - Move order to a new status (staff)
//!
//! GET    /contact                - Contact reports (staff)
//! GET    /summary                - Dashboard counters (staff)
//! ```

pub mod categories;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

/// Create the back-office router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route("/products/critical", get(products::critical))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/{id}",
            get(users::show).put(users::update).delete(users::delete),
        )
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", put(orders::update_status))
        .route("/contact", get(dashboard::contact_reports))
        .route("/summary", get(dashboard::summary))
}
