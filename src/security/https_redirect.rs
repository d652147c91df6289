//! Plain-HTTP to HTTPS redirect.
//!
//! Installed only in production with `FORCE_HTTPS`. It sits ahead of every
//! request-handling stage so unencrypted requests never reach routing.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, uri::Authority, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::http::error::ErrorBody;
use crate::security::forwarded::ProxyTrust;

pub async fn redirect_to_https(
    State(trust): State<Arc<ProxyTrust>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if trust.is_secure(&request) {
        return next.run(request).await;
    }

    match https_location(&request) {
        Some(location) => {
            tracing::debug!(uri = %request.uri(), location = ?location, "Redirecting to HTTPS");
            (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response()
        }
        None => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("Missing or invalid host header")),
        )
            .into_response(),
    }
}

/// The `https` equivalent of the request URL.
///
/// Default ports (80 and 443) are dropped from the authority; any other
/// explicit port is kept.
pub fn https_location<B>(request: &Request<B>) -> Option<HeaderValue> {
    let raw_host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()))?;
    let authority = Authority::from_str(&raw_host).ok()?;

    let host = match authority.port_u16() {
        Some(80) | Some(443) | None => authority.host().to_string(),
        Some(port) => format!("{}:{}", authority.host(), port),
    };
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    HeaderValue::from_str(&format!("https://{host}{path_and_query}")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(host: &str, uri: &str) -> Request<()> {
        Request::builder().uri(uri).header("host", host).body(()).unwrap()
    }

    #[test]
    fn drops_default_port() {
        let location = https_location(&request("api.valorix.fr:80", "/api/v1/reports?page=2")).unwrap();
        assert_eq!(location, "https://api.valorix.fr/api/v1/reports?page=2");
    }

    #[test]
    fn keeps_custom_port() {
        let location = https_location(&request("localhost:8000", "/health")).unwrap();
        assert_eq!(location, "https://localhost:8000/health");
    }

    #[test]
    fn falls_back_to_uri_authority() {
        let request = Request::builder().uri("http://api.valorix.fr/").body(()).unwrap();
        assert_eq!(https_location(&request).unwrap(), "https://api.valorix.fr/");
    }

    #[test]
    fn rejects_garbage_host() {
        assert!(https_location(&request("not a host", "/")).is_none());
    }
}
