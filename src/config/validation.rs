//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (the loader handles syntax)
//! - Check URLs and DSNs are well formed
//! - Validate value ranges (rates and timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Settings → Result<(), Vec<ValidationError>>
//! - Runs before settings are accepted into the system

use std::fmt;

use url::Url;

use crate::config::schema::Settings;

/// A single semantic problem with a settings field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Environment variable the problem originates from.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate loaded settings, collecting every problem.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for origin in &settings.cors.origins {
        if let Err(reason) = check_origin(origin) {
            errors.push(ValidationError::new("BACKEND_CORS_ORIGINS", format!("{origin:?} {reason}")));
        }
    }

    if let Err(e) = Url::parse(&settings.storage.database_url) {
        errors.push(ValidationError::new("DATABASE_URL", format!("not a valid URL: {e}")));
    }

    if let Some(redis_url) = &settings.cache.redis_url {
        if let Err(e) = Url::parse(redis_url) {
            errors.push(ValidationError::new("REDIS_URL", format!("not a valid URL: {e}")));
        }
    }

    if let Some(dsn) = &settings.reporting.sentry_dsn {
        if let Err(e) = dsn.expose().parse::<sentry::types::Dsn>() {
            errors.push(ValidationError::new("SENTRY_DSN", format!("not a valid DSN: {e}")));
        }
    }

    if settings.rate_limit.requests_per_second == 0 {
        errors.push(ValidationError::new("RATE_LIMIT_PER_SECOND", "must be greater than zero"));
    }
    if settings.rate_limit.burst_size == 0 {
        errors.push(ValidationError::new("RATE_LIMIT_BURST", "must be greater than zero"));
    }
    if settings.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("REQUEST_TIMEOUT_SECS", "must be greater than zero"));
    }

    if settings.server.allowed_hosts.is_empty() {
        errors.push(ValidationError::new("ALLOWED_HOSTS", "must list at least one host (use * for any)"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An origin is `*` or `scheme://host[:port]` with no path.
fn check_origin(origin: &str) -> Result<(), &'static str> {
    if origin == "*" {
        return Ok(());
    }
    let url = Url::parse(origin).map_err(|_| "is not a valid URL")?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err("must use http or https");
    }
    if url.host_str().is_none() {
        return Err("has no host");
    }
    if url.path() != "/" || url.query().is_some() || origin.ends_with('/') {
        return Err("must not carry a path, query or trailing slash");
    }
    Ok(())
}
