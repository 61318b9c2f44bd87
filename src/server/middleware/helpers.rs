//! Helper functions for middleware

use crate::config::IdentitySource;
use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;

/// Derive the identity key of a request. `None` means the request carries
/// no usable identity; the guard then keys it as `unknown`.
pub fn resolve_identity(req: &HttpRequest, source: &IdentitySource) -> Option<String> {
    let peer = || req.peer_addr().map(|addr| addr.ip().to_string());

    match source {
        IdentitySource::PeerAddr => peer(),
        IdentitySource::ForwardedFor { trusted_hops } => {
            header_value(req.headers(), "x-forwarded-for")
                .and_then(|value| forwarded_client(value, *trusted_hops))
                .map(str::to_string)
                .or_else(peer)
        }
        IdentitySource::Header { name } => header_value(req.headers(), name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
    }
}

/// Entry appended by the outermost of `trusted_hops` proxies. Anything left
/// of it was written by the client and is ignored.
fn forwarded_client(value: &str, trusted_hops: usize) -> Option<&str> {
    if trusted_hops == 0 {
        return None;
    }
    let hops: Vec<&str> = value.split(',').map(str::trim).collect();
    let index = hops.len().checked_sub(trusted_hops)?;
    hops.get(index).copied().filter(|hop| !hop.is_empty())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Token of an `Authorization: Bearer ...` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    header_value(headers, "authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// `2xx`, `4xx` and so on
pub fn status_class(status: u16) -> String {
    format!("{}xx", status / 100)
}
