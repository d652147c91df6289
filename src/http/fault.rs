//! Global server-fault translation.
//!
//! Handlers signal unexpected failures with [`ApiError::Internal`]; panics
//! are caught by [`panic_response`]. Both produce a 500 carrying a
//! [`Fault`] extension, which [`translate_faults`] reports and rewrites:
//! the fault message is returned as `detail` outside production and
//! replaced by a generic message in production.
//!
//! [`ApiError::Internal`]: crate::http::error::ApiError::Internal

use std::any::Any;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::Environment;
use crate::http::error::{ErrorBody, Fault, GENERIC_FAULT_MESSAGE};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::observability::reporting::RequestContext;

pub async fn translate_faults(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let context = RequestContext::new(request.method(), request.uri(), request.headers());
    let response = next.run(request).await;

    let Some(fault) = response.extensions().get::<Fault>().cloned() else {
        return response;
    };

    tracing::error!(
        method = %context.method,
        url = %context.url,
        kind = fault.kind.as_str(),
        error = %fault.message,
        "Unhandled server fault"
    );
    metrics::record_server_fault(fault.kind.as_str());
    state.reporter.capture_fault(&fault.message, &context);

    fault_response(&fault, &state.settings.app.environment)
}

/// Client-facing body for a fault under the given profile.
pub fn fault_body(fault: &Fault, environment: &Environment) -> ErrorBody {
    let detail = if environment.exposes_fault_details() {
        fault.message.clone()
    } else {
        GENERIC_FAULT_MESSAGE.to_string()
    };
    ErrorBody::new(GENERIC_FAULT_MESSAGE).with_detail(detail)
}

fn fault_response(fault: &Fault, environment: &Environment) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(fault_body(fault, environment))).into_response()
}

/// `CatchPanicLayer` handler turning a panic payload into a fault.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    Fault::panic(message).into_response()
}
