//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Only the authentication endpoints are limited: one token every 6 seconds
//! per client IP with a burst of 5 (~10 attempts per minute).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key used when neither a proxy header nor the peer address is available,
/// e.g. requests driven in-process without `ConnectInfo`.
const FALLBACK_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Key extractor that trusts `X-Forwarded-For` then `X-Real-IP`, then falls
/// back to the peer address.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip(req))
    }
}

/// Best-effort client IP for a request.
pub fn client_ip<T>(req: &Request<T>) -> IpAddr {
    let headers = req.headers();

    // First IP in the X-Forwarded-For chain
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(FALLBACK_IP, |ConnectInfo(addr)| addr.ip())
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Returns `None` only if the governor rejects the quota.
#[must_use]
pub fn auth_rate_limiter() -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6) // Replenish 1 token every 6 seconds
        .burst_size(5)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/api/auth/login")
    }

    #[test]
    fn test_forwarded_for_wins() {
        let req = request()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "198.51.100.2")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&req), "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_real_ip_then_peer_address() {
        let req = request().header("x-real-ip", "198.51.100.2").body(()).unwrap();
        assert_eq!(client_ip(&req), "198.51.100.2".parse::<IpAddr>().unwrap());

        let mut req = request().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 9], 4000))));
        assert_eq!(client_ip(&req), "192.0.2.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_fallback_without_any_source() {
        let req = request().header("x-forwarded-for", "garbage").body(()).unwrap();
        assert_eq!(client_ip(&req), FALLBACK_IP);
    }

    #[test]
    fn test_auth_limiter_builds() {
        assert!(auth_rate_limiter().is_some());
    }
}
