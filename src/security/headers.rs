//! Security response headers.
//!
//! # Responsibilities
//! - Stamp the fixed security header template on every response
//!
//! # Design Decisions
//! - Headers already set by a handler are left untouched
//! - Applies to redirects and error responses too

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::schema::SECURITY_HEADERS;

/// Wrap `router` with one header-setting layer per template entry.
pub fn with_security_headers(router: Router) -> Router {
    SECURITY_HEADERS
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
}
