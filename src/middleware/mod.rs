use hyper::{HeaderMap, header::{HeaderName, HeaderValue}};
use std::net::SocketAddr;

#[cfg(test)]
mod tests;

/// Picks the value for `access-control-allow-origin`, if the request's
/// origin is allowed at all.
pub fn allowed_origin(request_origin: Option<&str>, allowed: &[String]) -> Option<String> {
    if allowed.iter().any(|o| o == "*") {
        return Some("*".to_string());
    }
    let origin = request_origin?;
    allowed
        .iter()
        .find(|o| o.as_str() == origin)
        .map(|o| o.to_string())
}

pub fn add_cors_headers(headers: &mut HeaderMap, origin: &str) {
    let Ok(origin) = HeaderValue::from_str(origin) else {
        return;
    };
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        origin,
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        HeaderName::from_static("vary"),
        HeaderValue::from_static("Origin"),
    );
}

/// Identifies the caller for rate limiting: the first `X-Forwarded-For`
/// hop, else the peer address, else `unknown`.
pub fn client_id(forwarded_for: Option<&str>, remote: Option<SocketAddr>) -> String {
    forwarded_for
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
