//! Best-effort client address for Turnstile's `remoteip` field.

use axum::http::HeaderMap;

/// Returned when no proxy header names the client.
pub const UNKNOWN_IP: &str = "unknown";

/// Headers consulted in order; the first non-empty one wins.
const IP_HEADERS: &[&str] = &["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// Pick the client address from proxy headers.
///
/// `X-Forwarded-For` can hold a chain (`client, proxy1, proxy2`); only the
/// first entry is the client.
pub fn client_ip(headers: &HeaderMap) -> String {
    IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|ip| !ip.is_empty())
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let map = headers(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(client_ip(&map), "203.0.113.7");
    }

    #[test]
    fn test_fallback_order() {
        assert_eq!(client_ip(&headers(&[("x-real-ip", "198.51.100.1")])), "198.51.100.1");
        assert_eq!(
            client_ip(&headers(&[("cf-connecting-ip", "2001:db8::1")])),
            "2001:db8::1"
        );
        assert_eq!(
            client_ip(&headers(&[("x-forwarded-for", " "), ("x-real-ip", "198.51.100.2")])),
            "198.51.100.2"
        );
    }

    #[test]
    fn test_unknown_without_headers() {
        assert_eq!(client_ip(&HeaderMap::new()), UNKNOWN_IP);
    }
}
