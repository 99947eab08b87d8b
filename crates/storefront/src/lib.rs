//! Pastelería storefront library.
//!
//! JSON API for the bakery storefront and its back-office: catalog, cart,
//! accounts, checkout (card or PayPal), contact reports and receipts.
//! The binary in `main.rs` only loads configuration and serves [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod middleware;
pub mod models;
pub mod paypal;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::Response;
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::request_id::REQUEST_ID_HEADER;
use crate::middleware::{auth_rate_limiter, create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Errors assembling the router.
#[derive(Debug, thiserror::Error)]
pub enum AppBuildError {
    #[error("session store error: {0}")]
    Session(#[from] sqlx::Error),
    #[error("invalid rate limiter configuration")]
    RateLimiterConfig,
    #[error("invalid CORS_ORIGIN: {0}")]
    CorsOrigin(String),
}

/// Build the full application router.
///
/// Creates the session table when needed, so the pool must already be
/// migrated.
///
/// # Errors
///
/// Returns `AppBuildError` if the session store cannot be migrated, the
/// rate limiter rejects its quota or `CORS_ORIGIN` is not a valid header.
pub async fn app(state: AppState) -> Result<Router, AppBuildError> {
    let auth_limiter = auth_rate_limiter().ok_or(AppBuildError::RateLimiterConfig)?;
    let session_layer = create_session_layer(state.pool(), state.config()).await?;
    let cors = cors_layer(state.config().cors_origin.as_deref())?;

    let router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(auth_limiter))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        );

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    Ok(router
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction()))
}

/// CORS for the single-page frontend. Credentials are allowed so the
/// session cookie travels with cross-origin requests.
fn cors_layer(origin: Option<&str>) -> Result<Option<CorsLayer>, AppBuildError> {
    let Some(origin) = origin else {
        return Ok(None);
    };
    let origin = HeaderValue::from_str(origin.trim_end_matches('/'))
        .map_err(|_| AppBuildError::CorsOrigin(origin.to_string()))?;

    Ok(Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
            .expose_headers([
                routes::cart::CART_UPDATED_HEADER,
                HeaderName::from_static(REQUEST_ID_HEADER),
            ])
            .max_age(Duration::from_secs(60 * 60)),
    ))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer() {
        assert!(cors_layer(None).unwrap().is_none());
        assert!(cors_layer(Some("http://localhost:5173/")).unwrap().is_some());
        assert!(matches!(
            cors_layer(Some("http://bad\norigin")),
            Err(AppBuildError::CorsOrigin(_))
        ));
    }
}
