// ============================
// crates/backend-lib/src/media/url.rs
// ============================
//! Client-facing rewrite of presigned object URLs.
//!
//! The object store signs URLs for the authority the server reaches it on
//! (often an internal hostname such as `minio:9000`). Clients need an
//! authority they can resolve, so only scheme and authority are swapped;
//! path and query are kept byte-for-byte.

use std::net::{Ipv4Addr, Ipv6Addr};

/// Rewrite the authority of `generated`.
///
/// With `external_endpoint` (`https://host[:port]` or bare `host[:port]`,
/// the latter keeping the generated scheme) the authority is replaced by it.
/// Without one, a non-loopback host becomes `localhost`, port kept.
/// Input that does not look like an absolute URL is returned unchanged.
pub fn rewrite_presigned_url(generated: &str, external_endpoint: Option<&str>) -> String {
    let Some((scheme, rest)) = generated.split_once("://") else {
        return generated.to_string();
    };
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
    {
        return generated.to_string();
    }

    let split = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(split);
    if authority.is_empty() {
        return generated.to_string();
    }

    if let Some(external) = external_endpoint.map(str::trim).filter(|e| !e.is_empty()) {
        let (new_scheme, remainder) = external.split_once("://").unwrap_or((scheme, external));
        let new_authority = remainder
            .split(['/', '?', '#'])
            .next()
            .unwrap_or(remainder);
        if new_authority.is_empty() {
            return generated.to_string();
        }
        return format!("{new_scheme}://{new_authority}{tail}");
    }

    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let (host, port) = split_host_port(host_port);
    if is_loopback(host) {
        return generated.to_string();
    }
    match port {
        Some(port) => format!("{scheme}://localhost:{port}{tail}"),
        None => format!("{scheme}://localhost{tail}"),
    }
}

fn split_host_port(authority: &str) -> (&str, Option<&str>) {
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => {
                let (host, after) = authority.split_at(end + 1);
                (host, after.strip_prefix(':'))
            },
            None => (authority, None),
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    }
}

fn is_loopback(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return inner.parse::<Ipv6Addr>().is_ok_and(|ip| ip.is_loopback());
    }
    host.parse::<Ipv4Addr>().is_ok_and(|ip| ip.is_loopback())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNED: &str = "http://minio:9000/photos/a.jpg?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Signature=ab%2Fcd";

    #[test]
    fn test_internal_host_becomes_localhost() {
        assert_eq!(
            rewrite_presigned_url(SIGNED, None),
            "http://localhost:9000/photos/a.jpg?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Signature=ab%2Fcd"
        );
        assert_eq!(
            rewrite_presigned_url("https://storage.internal/photos/a.jpg?sig=1", None),
            "https://localhost/photos/a.jpg?sig=1"
        );
    }

    #[test]
    fn test_loopback_left_alone() {
        for url in [
            "http://localhost:9000/photos/a.jpg?s=1",
            "http://127.0.0.1:9000/photos/a.jpg?s=1",
            "http://[::1]:9000/photos/a.jpg?s=1",
        ] {
            assert_eq!(rewrite_presigned_url(url, None), url);
        }
    }

    #[test]
    fn test_external_override() {
        assert_eq!(
            rewrite_presigned_url(SIGNED, Some("https://media.example.com")),
            "https://media.example.com/photos/a.jpg?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Signature=ab%2Fcd"
        );
        assert_eq!(
            rewrite_presigned_url(SIGNED, Some("media.example.com:8443")),
            "http://media.example.com:8443/photos/a.jpg?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Signature=ab%2Fcd"
        );
        assert_eq!(
            rewrite_presigned_url(SIGNED, Some("https://media.example.com/")),
            "https://media.example.com/photos/a.jpg?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Signature=ab%2Fcd"
        );
        // blank override behaves as none
        assert_eq!(
            rewrite_presigned_url(SIGNED, Some("  ")),
            rewrite_presigned_url(SIGNED, None)
        );
    }

    #[test]
    fn test_unparseable_input_unchanged() {
        for input in ["", "not a url", "://nohost/path", "http:///path-only"] {
            assert_eq!(rewrite_presigned_url(input, None), input);
            assert_eq!(rewrite_presigned_url(input, Some("https://cdn.example.com")), input);
        }
    }
}
