//! Caller address resolution.
//!
//! The first `X-Forwarded-For` entry wins when a proxy supplied one and it is
//! an IP address; otherwise the TCP peer address is used. The result is always
//! a non-empty string no longer than an IPv6 address.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use http::request::Parts;
use http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Reported when neither a forwarded header nor a peer address is available
pub const UNKNOWN_CLIENT: &str = "unknown";

/// The caller's apparent network origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let peer = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr);

        Ok(ClientIp(resolve_client_ip(&parts.headers, peer)))
    }
}

/// First non-empty entry of `X-Forwarded-For`, if any.
fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|entry| !entry.is_empty())
}

/// Address in a forwarded entry. Some proxies append the client port.
fn parse_forwarded_ip(entry: &str) -> Option<IpAddr> {
    entry
        .parse::<IpAddr>()
        .or_else(|_| entry.parse::<SocketAddr>().map(|addr| addr.ip()))
        .ok()
}

pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(entry) = forwarded_for(headers) {
        match parse_forwarded_ip(entry) {
            Some(ip) => return ip.to_string(),
            None => tracing::debug!(entry = %entry, "Ignoring malformed X-Forwarded-For entry"),
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
