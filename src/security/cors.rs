//! CORS policy construction.
//!
//! `*` in a list means "anything". With credentials allowed, browsers do
//! not accept a literal `*`, so wildcards are mirrored from the request
//! instead and exposed headers fall back to the ones this API emits.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};

use crate::config::schema::CorsSettings;
use crate::http::error::BootstrapError;

/// Preflight cache lifetime.
pub const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Exposed when credentials forbid the `*` wildcard.
const EXPOSED_WITH_CREDENTIALS: [&str; 3] = ["x-request-id", "retry-after", "content-disposition"];

fn is_wildcard(items: &[String]) -> bool {
    items.iter().any(|item| item.trim() == "*")
}

pub fn build_cors_layer(cors: &CorsSettings) -> Result<CorsLayer, BootstrapError> {
    let credentials = cors.allow_credentials;

    let origins = if is_wildcard(&cors.origins) {
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        }
    } else {
        let values = cors
            .origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| BootstrapError::InvalidCors {
                    kind: "origin",
                    value: origin.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };

    let methods = if is_wildcard(&cors.allow_methods) {
        if credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::any()
        }
    } else {
        let values = cors
            .allow_methods
            .iter()
            .map(|method| {
                Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
                    BootstrapError::InvalidCors {
                        kind: "method",
                        value: method.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowMethods::list(values)
    };

    let headers = if is_wildcard(&cors.allow_headers) {
        if credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::any()
        }
    } else {
        let values = cors
            .allow_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes()).map_err(|_| {
                    BootstrapError::InvalidCors {
                        kind: "header",
                        value: name.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowHeaders::list(values)
    };

    let expose = if credentials {
        ExposeHeaders::list(EXPOSED_WITH_CREDENTIALS.map(HeaderName::from_static))
    } else {
        ExposeHeaders::any()
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(credentials)
        .expose_headers(expose)
        .max_age(PREFLIGHT_MAX_AGE))
}
