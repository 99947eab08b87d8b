//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. CORS (only when `CORS_ORIGIN` is configured)
//! 4. Request ID (add unique ID to each request)
//! 5. Session layer (tower-sessions with SQLite store)
//! 6. Rate limiting on `/api/auth/*` (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAdmin, RequireAuth, RequireStaff, clear_current_user, set_current_user,
};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
