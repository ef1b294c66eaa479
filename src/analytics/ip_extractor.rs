//! Visitor details pulled from inbound request headers
//!
//! The service is expected to run behind a proxy that sets `X-Forwarded-For`
//! or `X-Real-IP`. Without either header the client is recorded under the
//! `"unknown"` sentinel, which geolocation treats as a local source.

use axum::http::{header, HeaderMap};

use crate::analytics::geoip::UNKNOWN_IP;
use crate::analytics::models::VisitContext;

/// Referrer recorded when the request carries no `Referer` header
pub const DIRECT_REFERRER: &str = "direct";

/// User-agent recorded when the request carries none
pub const UNKNOWN_USER_AGENT: &str = "unknown";

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Extract the client IP: leftmost `X-Forwarded-For` hop, then `X-Real-IP`
pub fn extract_client_ip(headers: &HeaderMap) -> String {
    let forwarded = header_str(headers, "x-forwarded-for").and_then(|xff| {
        xff.split(',')
            .map(str::trim)
            .find(|hop| !hop.is_empty())
    });

    forwarded
        .or_else(|| header_str(headers, "x-real-ip"))
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

pub fn extract_visit_context(headers: &HeaderMap) -> VisitContext {
    VisitContext {
        client_ip: extract_client_ip(headers),
        user_agent: header_str(headers, header::USER_AGENT)
            .unwrap_or(UNKNOWN_USER_AGENT)
            .to_string(),
        referrer: header_str(headers, header::REFERER)
            .unwrap_or(DIRECT_REFERRER)
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_no_headers_is_unknown() {
        let headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers), "unknown");
    }

    #[test]
    fn test_x_forwarded_for_leftmost() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.1, 198.51.100.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.1"));

        assert_eq!(extract_client_ip(&headers), "203.0.113.1");
    }

    #[test]
    fn test_x_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.7"));

        assert_eq!(extract_client_ip(&headers), "198.51.100.7");
    }

    #[test]
    fn test_visit_context_defaults() {
        let context = extract_visit_context(&HeaderMap::new());
        assert_eq!(context.client_ip, "unknown");
        assert_eq!(context.user_agent, "unknown");
        assert_eq!(context.referrer, "direct");
    }

    #[test]
    fn test_visit_context_reads_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.5.0"));
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://news.example.org/post"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));

        let context = extract_visit_context(&headers);
        assert_eq!(context.client_ip, "1.2.3.4");
        assert_eq!(context.user_agent, "curl/8.5.0");
        assert_eq!(context.referrer, "https://news.example.org/post");
    }
}
