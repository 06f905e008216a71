//! Request guards: API key, IP allow-list and rate limiting.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, OriginalUri, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::error::AppError;
use crate::rate_limit::{RateLimitStatus, RateLimiter};
use crate::web::signature::constant_time_compare;
use crate::web::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Client address: socket peer, then first `X-Forwarded-For` hop.
pub fn client_ip(request: &Request) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    resolve_client_ip(peer, request.headers())
}

pub fn resolve_client_ip(peer: Option<SocketAddr>, headers: &HeaderMap) -> String {
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => forwarded_for(headers).unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Full request path, including any prefix a nested router stripped.
fn request_path(request: &Request) -> String {
    match request.extensions().get::<OriginalUri>() {
        Some(OriginalUri(uri)) => uri.path().to_string(),
        None => request.uri().path().to_string(),
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Forwarded-For")?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|hop| !hop.is_empty())
        .map(str::to_string)
}

/// Require `X-API-Key` to match the configured key.
///
/// A missing header is 401. A wrong key, or no key configured on the
/// server, is 403.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request_path(&request);
    let ip = client_ip(&request);

    let provided = match request.headers().get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        Some(key) if !key.is_empty() => key,
        _ => {
            warn!(ip = %ip, path = %path, "api_key_missing");
            return Err(AppError::Unauthorized("API Key não fornecida".into()));
        }
    };

    let valid = state
        .config
        .api_key
        .as_deref()
        .is_some_and(|expected| constant_time_compare(expected, provided));

    if !valid {
        warn!(ip = %ip, path = %path, "api_key_invalid");
        return Err(AppError::Forbidden("API Key inválida".into()));
    }

    info!(ip = %ip, path = %path, "api_key_accepted");
    Ok(next.run(request).await)
}

/// Reject clients outside `ALLOWED_IPS`; an empty list allows everyone.
pub async fn require_allowed_ip(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let allowed = &state.config.allowed_ips;
    if allowed.is_empty() {
        return Ok(next.run(request).await);
    }

    let ip = client_ip(&request);
    if !allowed.iter().any(|a| a == &ip) {
        warn!(ip = %ip, path = %request_path(&request), "ip_not_allowed");
        return Err(AppError::Forbidden("IP não autorizado".into()));
    }

    Ok(next.run(request).await)
}

pub async fn global_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    enforce(&state.global_limiter, request, next).await
}

pub async fn webhook_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    enforce(&state.webhook_limiter, request, next).await
}

async fn enforce(limiter: &RateLimiter, request: Request, next: Next) -> Response {
    let ip = client_ip(&request);
    let status = limiter.check(&ip);

    let mut response = if status.allowed {
        next.run(request).await
    } else {
        warn!(
            ip = %ip,
            path = %request_path(&request),
            method = %request.method(),
            "rate_limit_rejected"
        );
        AppError::RateLimited(limiter.message().to_string()).into_response()
    };

    set_rate_limit_headers(response.headers_mut(), &status);
    response
}

/// Headers already set by an inner, more specific limiter are kept.
fn set_rate_limit_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    let values = [
        ("ratelimit-limit", HeaderValue::from(status.limit)),
        ("ratelimit-remaining", HeaderValue::from(status.remaining)),
        ("ratelimit-reset", HeaderValue::from(status.reset_secs)),
    ];
    for (name, value) in values {
        headers.entry(HeaderName::from_static(name)).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(forwarded_for(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn test_client_ip_prefers_socket() {
        let mut request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 0, 9], 5000))));

        assert_eq!(client_ip(&request), "192.168.0.9");
    }

    #[test]
    fn test_resolve_client_ip_falls_back_to_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(resolve_client_ip(None, &headers), "198.51.100.4");

        let peer = SocketAddr::from(([10, 0, 0, 2], 443));
        assert_eq!(resolve_client_ip(Some(peer), &headers), "10.0.0.2");
    }

    #[test]
    fn test_request_path_prefers_original_uri() {
        let mut request = Request::builder()
            .uri("/webhook")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_path(&request), "/webhook");

        request
            .extensions_mut()
            .insert(OriginalUri("/api/hubspot/webhook".parse().unwrap()));
        assert_eq!(request_path(&request), "/api/hubspot/webhook");
    }

    #[test]
    fn test_client_ip_unknown() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), "unknown");
    }
}
