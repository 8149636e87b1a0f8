//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Order placement is the only limited endpoint: each call decrements stock
//! and allocates an order code, so bursts are capped per client IP.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Proxy headers carrying the client IP, in order of trust.
///
/// `x-forwarded-for` is handled separately (first entry of the chain).
const SINGLE_IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-real-ip", "fly-client-ip"];

/// Key extractor for deployments behind Cloudflare or Fly.io.
///
/// Reads `CF-Connecting-IP`, then the first `X-Forwarded-For` hop, then
/// `X-Real-IP` and `Fly-Client-IP`, and finally the peer address from
/// [`ConnectInfo`].
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

fn client_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    let headers = req.headers();
    let [cloudflare, real_ip, fly] = SINGLE_IP_HEADERS;

    header_ip(headers, cloudflare)
        .or_else(|| forwarded_ip(headers))
        .or_else(|| header_ip(headers, real_ip))
        .or_else(|| header_ip(headers, fly))
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req).ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the rate limiter for order placement: ~10 orders per minute per IP.
///
/// Configuration: 1 token every 6 seconds, burst of 10.
///
/// # Panics
///
/// This function will not panic. `per_second(6)` and `burst_size(10)` are
/// non-zero, which is all `GovernorConfigBuilder::finish` checks.
#[must_use]
pub fn order_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6)
        .burst_size(10)
        .finish()
        .expect("order rate limiter config with non-zero period and burst is valid");
    GovernorLayer::new(Arc::new(config))
}
