//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Errors render as `{"error": "<message>"}`. Server-side failures never
//! expose their details. PayPal's own error answers are the exception: they
//! are relayed with PayPal's status and body unchanged.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use pasteleria_core::CartError;

use crate::db::RepositoryError;
use crate::paypal::PayPalError;
use crate::services::auth::AuthError;
use crate::services::cart::CartServiceError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartServiceError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// PayPal API operation failed.
    #[error("PayPal error: {0}")]
    PayPal(#[from] PayPalError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The PayPal error inside this error, if any.
    fn paypal(&self) -> Option<&PayPalError> {
        match self {
            Self::PayPal(err) | Self::Checkout(CheckoutError::PayPal(err)) => Some(err),
            _ => None,
        }
    }

    /// Status and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository(err),
            Self::Auth(err) => auth(err),
            Self::Cart(err) => cart(err),
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart | CheckoutError::MissingCard => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                CheckoutError::Card(card) => (StatusCode::BAD_REQUEST, card.to_string()),
                CheckoutError::PayPal(err) => paypal(err),
                CheckoutError::Cart(err) => cart(err),
                CheckoutError::Repository(err) => repository(err),
            },
            Self::PayPal(err) => paypal(err),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "demasiadas solicitudes, intenta más tarde".to_string(),
            ),
            Self::Session(_) | Self::Internal(_) => internal(),
        }
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn repository(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "no encontrado".to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => internal(),
    }
}

fn auth(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "correo o contraseña incorrectos".to_string(),
        ),
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            "ya existe una cuenta con ese correo".to_string(),
        ),
        AuthError::WeakPassword(msg) | AuthError::InvalidInput(msg) => {
            (StatusCode::BAD_REQUEST, msg.clone())
        }
        AuthError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "correo inválido".to_string()),
        AuthError::Repository(err) => repository(err),
        AuthError::PasswordHash => internal(),
    }
}

fn cart(err: &CartServiceError) -> (StatusCode, String) {
    match err {
        CartServiceError::Cart(CartError::InvalidQuantity) => (
            StatusCode::BAD_REQUEST,
            "la cantidad debe ser al menos 1".to_string(),
        ),
        CartServiceError::Cart(CartError::OutOfStock(_)) => {
            (StatusCode::CONFLICT, "producto sin stock".to_string())
        }
        CartServiceError::Cart(CartError::LineNotFound(_)) => (
            StatusCode::NOT_FOUND,
            "el producto no está en el carrito".to_string(),
        ),
        CartServiceError::ProductNotFound(_) => {
            (StatusCode::NOT_FOUND, "producto no encontrado".to_string())
        }
        CartServiceError::Repository(err) => repository(err),
    }
}

fn paypal(err: &PayPalError) -> (StatusCode, String) {
    match err {
        PayPalError::Upstream { status, .. } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            "PayPal rechazó la solicitud".to_string(),
        ),
        PayPalError::Price(err) => (StatusCode::BAD_REQUEST, err.to_string()),
        PayPalError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        PayPalError::Http(_) | PayPalError::Parse(_) => (
            StatusCode::BAD_GATEWAY,
            "External service error".to_string(),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // PayPal's own answer goes back unchanged.
        if let Some(PayPalError::Upstream { status, body }) = self.paypal() {
            tracing::warn!(status, "Relaying PayPal error response");
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            return (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                body.clone(),
            )
                .into_response();
        }

        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("pastel_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
