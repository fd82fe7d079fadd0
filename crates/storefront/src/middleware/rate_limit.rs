//! Per-IP rate limiting with `tower_governor`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::key_extractor::KeyExtractor;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

/// Client address as reported by a reverse proxy.
///
/// `X-Forwarded-For` wins over `X-Real-IP`; only the first hop of the
/// forwarded chain is used.
fn proxied_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    let parse = |raw: &str| raw.trim().parse::<IpAddr>().ok();

    header("x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .and_then(parse)
        .or_else(|| header("x-real-ip").and_then(parse))
}

/// Keys requests by client IP.
///
/// Falls back to the TCP peer, which is only present when the server runs
/// with `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        proxied_ip(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(peer)| peer.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Token bucket per client IP: one token every `replenish_secs`, holding at
/// most `burst`.
///
/// # Panics
///
/// Panics if either argument is zero. Both call sites pass constants.
fn per_ip_limiter(replenish_secs: u64, burst: u32) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_secs)
        .burst_size(burst)
        .finish()
        .expect("rate limiter periods and burst sizes are non-zero");
    GovernorLayer::new(Arc::new(config))
}

/// Limiter for `/api/auth`: about ten attempts a minute, burst of five.
/// Slows down guessing of passcodes and passwords.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    per_ip_limiter(6, 5)
}

/// Limiter for the remaining API routes: about sixty requests a minute with
/// room for a page load's worth of bursts.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    per_ip_limiter(1, 50)
}

/// Replace the limiter's plain-text 429 body with the API's JSON error body.
pub async fn json_rate_limit_response(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }

    let mut rewritten = AppError::RateLimited.into_response();
    for (name, value) in response.headers() {
        if *name == header::RETRY_AFTER || name.as_str().starts_with("x-ratelimit") {
            rewritten.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rewritten
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_header_wins() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();
        let ip = ClientIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_real_ip_header() {
        let req = Request::builder()
            .header("x-real-ip", " 2001:db8::5 ")
            .body(())
            .unwrap();
        let ip = ClientIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(ip, "2001:db8::5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("198.51.100.4:5555".parse::<SocketAddr>().unwrap()));
        let ip = ClientIpKeyExtractor.extract(&req).unwrap();
        assert_eq!(ip, "198.51.100.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_no_source_is_an_error() {
        let req = Request::builder().body(()).unwrap();
        assert!(ClientIpKeyExtractor.extract(&req).is_err());
    }

    #[tokio::test]
    async fn test_429_rewritten_as_json() {
        let limited = Response::builder()
            .status(StatusCode::TOO_MANY_REQUESTS)
            .header(header::RETRY_AFTER, "6")
            .body(axum::body::Body::from("Too Many Requests!"))
            .unwrap();

        let response = json_rate_limit_response(limited).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "6");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }
}
