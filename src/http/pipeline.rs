//! Ordered middleware pipeline.
//!
//! [`plan`] decides which stages run for a given configuration, outermost
//! first. [`apply`] wraps a router in that order. Keeping the plan as data
//! lets the composition be checked without binding a socket.

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::{CorsSettings, RateLimitSettings};
use crate::config::Settings;
use crate::http::error::BootstrapError;
use crate::http::fault::{panic_response, translate_faults};
use crate::http::server::AppState;
use crate::security::cors::build_cors_layer;
use crate::security::forwarded::ProxyTrust;
use crate::security::headers::with_security_headers;
use crate::security::hosts::{check_host, AllowedHosts};
use crate::security::https_redirect::redirect_to_https;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// One middleware step.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    SecurityHeaders,
    HttpsRedirect,
    RequestId,
    Trace,
    TrustedHosts(Vec<String>),
    Cors(CorsSettings),
    RateLimit(RateLimitSettings),
    FaultTranslation,
    Timeout(Duration),
    BodyLimit(usize),
    CatchPanic,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::SecurityHeaders => "security_headers",
            Stage::HttpsRedirect => "https_redirect",
            Stage::RequestId => "request_id",
            Stage::Trace => "trace",
            Stage::TrustedHosts(_) => "trusted_hosts",
            Stage::Cors(_) => "cors",
            Stage::RateLimit(_) => "rate_limit",
            Stage::FaultTranslation => "fault_translation",
            Stage::Timeout(_) => "timeout",
            Stage::BodyLimit(_) => "body_limit",
            Stage::CatchPanic => "catch_panic",
        }
    }
}

/// Stages for `settings`, outermost first.
pub fn plan(settings: &Settings) -> Vec<Stage> {
    let mut stages = vec![Stage::SecurityHeaders];

    if settings.app.environment.is_production() && settings.server.force_https {
        stages.push(Stage::HttpsRedirect);
    }

    stages.push(Stage::RequestId);
    stages.push(Stage::Trace);

    if !settings.server.accepts_any_host() {
        stages.push(Stage::TrustedHosts(settings.server.allowed_hosts.clone()));
    }

    if !settings.cors.origins.is_empty() {
        stages.push(Stage::Cors(settings.cors.clone()));
    }

    stages.push(Stage::RateLimit(settings.rate_limit.clone()));
    stages.push(Stage::FaultTranslation);
    stages.push(Stage::Timeout(Duration::from_secs(
        settings.server.request_timeout_secs,
    )));
    stages.push(Stage::BodyLimit(settings.storage.max_upload_size));
    stages.push(Stage::CatchPanic);

    stages
}

/// Wrap `router` with `stages`, the first stage ending up outermost.
pub fn apply(router: Router, stages: &[Stage], state: &AppState) -> Result<Router, BootstrapError> {
    let trust = ProxyTrust::new(state.settings.server.forwarded_allow_ips.clone());

    stages.iter().rev().try_fold(router, |router, stage| {
        tracing::debug!(stage = stage.name(), "Installing middleware");
        apply_stage(router, stage, state, &trust)
    })
}

#[allow(deprecated)]
fn apply_stage(
    router: Router,
    stage: &Stage,
    state: &AppState,
    trust: &ProxyTrust,
) -> Result<Router, BootstrapError> {
    let router = match stage {
        Stage::SecurityHeaders => with_security_headers(router),
        Stage::HttpsRedirect => router.layer(middleware::from_fn_with_state(
            Arc::new(trust.clone()),
            redirect_to_https,
        )),
        // Propagation must sit inside the layer that assigns the id.
        Stage::RequestId => router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid)),
        Stage::Trace => router.layer(TraceLayer::new_for_http()),
        Stage::TrustedHosts(hosts) => router.layer(middleware::from_fn_with_state(
            Arc::new(AllowedHosts::new(hosts)),
            check_host,
        )),
        Stage::Cors(cors) => router.layer(build_cors_layer(cors)?),
        Stage::RateLimit(limits) => router.layer(middleware::from_fn_with_state(
            Arc::new(RateLimiter::new(limits, trust.clone())),
            rate_limit_middleware,
        )),
        Stage::FaultTranslation => {
            router.layer(middleware::from_fn_with_state(state.clone(), translate_faults))
        }
        Stage::Timeout(timeout) => router.layer(TimeoutLayer::new(*timeout)),
        Stage::BodyLimit(limit) => router.layer(RequestBodyLimitLayer::new(*limit)),
        Stage::CatchPanic => router.layer(CatchPanicLayer::custom(panic_response)),
    };
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::http::error::ErrorBody;
    use crate::observability::NoopReporter;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    fn names(settings: &Settings) -> Vec<&'static str> {
        plan(settings).iter().map(Stage::name).collect()
    }

    fn state(settings: Settings) -> AppState {
        AppState {
            settings: Arc::new(settings),
            reporter: Arc::new(NoopReporter),
        }
    }

    fn build(settings: Settings) -> Router {
        let state = state(settings);
        let stages = plan(&state.settings);
        let router = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route(
                "/boom",
                get(|| async { Err::<(), _>(crate::http::error::ApiError::internal("disk on fire")) }),
            )
            .with_state(state.clone());
        apply(router, &stages, &state).unwrap()
    }

    #[test]
    fn default_plan() {
        assert_eq!(
            names(&Settings::default()),
            vec![
                "security_headers",
                "request_id",
                "trace",
                "cors",
                "rate_limit",
                "fault_translation",
                "timeout",
                "body_limit",
                "catch_panic",
            ]
        );
    }

    #[test]
    fn https_redirect_only_in_production() {
        let mut settings = Settings::default();
        settings.server.force_https = true;
        assert!(!names(&settings).contains(&"https_redirect"));

        settings.app.environment = Environment::Production;
        let stages = names(&settings);
        assert_eq!(stages[1], "https_redirect");
    }

    #[test]
    fn optional_stages() {
        let mut settings = Settings::default();
        settings.cors.origins.clear();
        settings.server.allowed_hosts = vec!["api.valorix.fr".into()];
        let stages = names(&settings);
        assert!(!stages.contains(&"cors"));
        assert!(stages.contains(&"trusted_hosts"));
    }

    #[tokio::test]
    async fn responses_carry_headers() {
        let app = build(Settings::default());
        let response = app
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn faults_are_translated() {
        let app = build(Settings::default());
        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.detail.as_deref(), Some("disk on fire"));
    }

    #[tokio::test]
    async fn unknown_host_is_rejected() {
        let mut settings = Settings::default();
        settings.server.allowed_hosts = vec!["api.valorix.fr".into()];
        let app = build(settings);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ok")
                    .header("host", "evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
