//! `Host` header allow-list.
//!
//! Entries are exact host names or `*.domain` suffix patterns. Ports are
//! ignored when matching.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::http::error::ErrorBody;

#[derive(Debug, Clone)]
pub struct AllowedHosts {
    patterns: Vec<String>,
}

impl AllowedHosts {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| p.trim().to_ascii_lowercase()).collect(),
        }
    }

    pub fn is_allowed(&self, host: &str) -> bool {
        let host = strip_port(host).to_ascii_lowercase();
        self.patterns.iter().any(|pattern| {
            if pattern == "*" {
                true
            } else if let Some(suffix) = pattern.strip_prefix("*.") {
                host.ends_with(&format!(".{suffix}"))
            } else {
                *pattern == host
            }
        })
    }
}

fn strip_port(host: &str) -> &str {
    // bracketed IPv6 literal, e.g. [::1]:8000
    if let Some(end) = host.find(']') {
        return &host[..=end];
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

pub async fn check_host(
    State(allowed): State<Arc<AllowedHosts>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if allowed.is_allowed(host) {
        next.run(request).await
    } else {
        tracing::warn!(host = %host, "Rejected request with untrusted host");
        (StatusCode::BAD_REQUEST, Json(ErrorBody::new("Invalid host header"))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_wildcard_patterns() {
        let allowed = AllowedHosts::new(&["api.valorix.fr".into(), "*.valorix.dev".into()]);
        assert!(allowed.is_allowed("api.valorix.fr"));
        assert!(allowed.is_allowed("API.valorix.fr:443"));
        assert!(allowed.is_allowed("staging.valorix.dev"));
        assert!(!allowed.is_allowed("valorix.dev"));
        assert!(!allowed.is_allowed("evil.example.com"));
        assert!(!allowed.is_allowed(""));
    }

    #[test]
    fn star_accepts_anything() {
        assert!(AllowedHosts::new(&["*".into()]).is_allowed("whatever:1234"));
    }

    #[test]
    fn ipv6_literals() {
        let allowed = AllowedHosts::new(&["[::1]".into()]);
        assert!(allowed.is_allowed("[::1]:8000"));
    }
}
