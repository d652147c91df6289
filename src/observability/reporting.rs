//! Remote error reporting.
//!
//! Faults translated by the HTTP layer are forwarded to an
//! [`ErrorReporter`]. With a `SENTRY_DSN` configured this is the Sentry
//! client; otherwise reports are dropped.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, Uri};
use sentry::protocol::Event;
use sentry::types::{Dsn, ParseDsnError};
use thiserror::Error;

use crate::config::Settings;

/// Header values never forwarded to the reporting backend.
pub const REDACTED_HEADERS: [&str; 5] = [
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
];

const REDACTED: &str = "[Filtered]";

#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("invalid Sentry DSN: {0}")]
    InvalidDsn(#[from] ParseDsnError),
}

/// Request data attached to a fault report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            url: uri.to_string(),
            method: method.to_string(),
            headers: scrub_headers(headers),
        }
    }
}

/// Copy headers, replacing credentials and cookies.
pub fn scrub_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let key = name.as_str().to_string();
            let value = if REDACTED_HEADERS.contains(&name.as_str()) {
                REDACTED.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (key, value)
        })
        .collect()
}

/// Sink for unhandled server faults.
pub trait ErrorReporter: Send + Sync {
    fn capture_fault(&self, message: &str, request: &RequestContext);
}

/// Reporter used when no DSN is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn capture_fault(&self, _message: &str, _request: &RequestContext) {}
}

/// Forwards faults to the Sentry hub installed by [`init_reporting`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SentryReporter;

#[derive(Debug)]
struct ServerFault(String);

impl fmt::Display for ServerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ServerFault {}

impl ErrorReporter for SentryReporter {
    fn capture_fault(&self, message: &str, request: &RequestContext) {
        let context = serde_json::json!({
            "url": request.url,
            "method": request.method,
            "headers": request.headers,
        });
        let fault = ServerFault(message.to_string());

        sentry::with_scope(
            |scope| {
                scope.set_extra("request", context);
                scope.set_tag("http.method", &request.method);
            },
            || sentry::capture_error(&fault),
        );
    }
}

/// Client options derived from the settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportingOptions {
    pub release: String,
    pub environment: String,
    pub server_name: String,
    pub deployment: String,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
    pub send_default_pii: bool,
}

impl ReportingOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let rate = settings.app.environment.report_sample_rate();
        Self {
            release: settings.app.version.clone(),
            environment: settings.app.environment.to_string(),
            server_name: settings.app.server_name.clone(),
            deployment: settings.app.deployment_env.clone(),
            sample_rate: rate,
            traces_sample_rate: rate,
            send_default_pii: false,
        }
    }

    /// Stamp server name and deployment tags on an outgoing event.
    pub fn stamp(&self, mut event: Event<'static>) -> Event<'static> {
        event.server_name = Some(Cow::Owned(self.server_name.clone()));
        event.tags.insert("app_version".to_string(), self.release.clone());
        event.tags.insert("deployment".to_string(), self.deployment.clone());
        event
    }

    fn into_client_options(self, dsn: Dsn) -> sentry::ClientOptions {
        let stamping = self.clone();
        sentry::ClientOptions {
            dsn: Some(dsn),
            release: Some(Cow::Owned(self.release)),
            environment: Some(Cow::Owned(self.environment)),
            server_name: Some(Cow::Owned(self.server_name)),
            sample_rate: self.sample_rate,
            traces_sample_rate: self.traces_sample_rate,
            send_default_pii: self.send_default_pii,
            before_send: Some(Arc::new(move |event: Event<'static>| Some(stamping.stamp(event)))),
            ..Default::default()
        }
    }
}

/// Active reporter plus the client guard that flushes pending events on drop.
pub struct Reporting {
    reporter: Arc<dyn ErrorReporter>,
    guard: Option<sentry::ClientInitGuard>,
}

impl Reporting {
    pub fn reporter(&self) -> Arc<dyn ErrorReporter> {
        Arc::clone(&self.reporter)
    }

    pub fn is_enabled(&self) -> bool {
        self.guard.is_some()
    }
}

/// Initialize Sentry when a DSN is configured.
pub fn init_reporting(settings: &Settings) -> Result<Reporting, ReportingError> {
    let Some(dsn) = &settings.reporting.sentry_dsn else {
        tracing::info!("Error reporting disabled (no SENTRY_DSN)");
        return Ok(Reporting {
            reporter: Arc::new(NoopReporter),
            guard: None,
        });
    };

    let dsn: Dsn = dsn.expose().parse()?;
    let options = ReportingOptions::from_settings(settings);
    tracing::info!(
        environment = %options.environment,
        sample_rate = options.sample_rate,
        "Error reporting enabled"
    );
    let guard = sentry::init(options.into_client_options(dsn));

    Ok(Reporting {
        reporter: Arc::new(SentryReporter),
        guard: Some(guard),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, Secret};
    use axum::http::HeaderValue;

    #[test]
    fn sampling_depends_on_profile() {
        let mut settings = Settings::default();
        let options = ReportingOptions::from_settings(&settings);
        assert_eq!(options.sample_rate, 1.0);
        assert_eq!(options.traces_sample_rate, 1.0);
        assert!(!options.send_default_pii);

        settings.app.environment = Environment::Production;
        let options = ReportingOptions::from_settings(&settings);
        assert_eq!(options.sample_rate, 0.1);
        assert_eq!(options.traces_sample_rate, 0.1);
        assert_eq!(options.environment, "production");
    }

    #[test]
    fn events_are_tagged() {
        let mut settings = Settings::default();
        settings.app.deployment_env = "eu-west".into();
        let event = ReportingOptions::from_settings(&settings).stamp(Event::default());

        assert_eq!(event.server_name.as_deref(), Some("valorix-api"));
        assert_eq!(event.tags.get("app_version").map(String::as_str), Some("1.0.0"));
        assert_eq!(event.tags.get("deployment").map(String::as_str), Some("eu-west"));
    }

    #[test]
    fn credentials_are_scrubbed() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        headers.insert("cookie", HeaderValue::from_static("session=xyz"));
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let scrubbed = scrub_headers(&headers);
        assert_eq!(scrubbed["authorization"], "[Filtered]");
        assert_eq!(scrubbed["cookie"], "[Filtered]");
        assert_eq!(scrubbed["accept"], "application/json");
    }

    #[test]
    fn panics_are_left_to_the_fault_translation() {
        let dsn: Dsn = "https://public@sentry.example.com/1".parse().unwrap();
        let options = ReportingOptions::from_settings(&Settings::default()).into_client_options(dsn);
        let options = sentry::apply_defaults(options);

        let names: Vec<_> = options.integrations.iter().map(|i| i.name()).collect();
        assert!(!names.contains(&"panic"), "integrations: {names:?}");
    }

    #[test]
    fn disabled_without_dsn() {
        let reporting = init_reporting(&Settings::default()).unwrap();
        assert!(!reporting.is_enabled());
    }

    #[test]
    fn rejects_malformed_dsn() {
        let mut settings = Settings::default();
        settings.reporting.sentry_dsn = Some(Secret::new("definitely not a dsn"));
        assert!(matches!(init_reporting(&settings), Err(ReportingError::InvalidDsn(_))));
    }
}
