//! Client address and scheme resolution behind reverse proxies.
//!
//! `X-Forwarded-For` and `X-Forwarded-Proto` are honored only when the
//! direct peer is listed in `FORWARDED_ALLOW_IPS`. Anything else could be
//! forged by the client.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{Request, Uri};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

#[derive(Debug, Clone, Default)]
pub struct ProxyTrust {
    trusted: Vec<IpAddr>,
}

impl ProxyTrust {
    pub fn new(trusted: Vec<IpAddr>) -> Self {
        Self { trusted }
    }

    fn trusts<B>(&self, request: &Request<B>) -> bool {
        peer_ip(request).is_some_and(|ip| self.trusted.contains(&ip))
    }

    /// Address used to identify the client (rate-limit key).
    pub fn client_ip<B>(&self, request: &Request<B>) -> Option<IpAddr> {
        if self.trusts(request) {
            let forwarded = request
                .headers()
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse().ok());
            if forwarded.is_some() {
                return forwarded;
            }
        }
        peer_ip(request)
    }

    /// Whether the request reached us over TLS.
    pub fn is_secure<B>(&self, request: &Request<B>) -> bool {
        if uri_is_https(request.uri()) {
            return true;
        }
        self.trusts(request)
            && request
                .headers()
                .get(X_FORWARDED_PROTO)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
    }
}

fn uri_is_https(uri: &Uri) -> bool {
    uri.scheme_str().is_some_and(|s| s.eq_ignore_ascii_case("https"))
}

/// Direct peer address, present when served with connect info.
pub fn peer_ip<B>(request: &Request<B>) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}
