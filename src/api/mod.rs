//! HTTP handlers

pub mod analysis;
pub mod health;
pub mod metrics;
pub mod webhook;

use axum::http::HeaderMap;

/// Client address as seen through proxies.
///
/// First entry of `X-Forwarded-For`, then `X-Real-IP` (which
/// `inject_client_ip` fills from the socket for direct connections).
pub(crate) fn extract_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    };

    if let Some(first) = header("x-forwarded-for").and_then(|v| v.split(',').next()) {
        let first = first.trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }

    header("x-real-ip")
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
