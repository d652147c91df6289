//! Error types for the HTTP layer.

use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body returned for any server fault in production.
pub const GENERIC_FAULT_MESSAGE: &str = "Internal server error";

/// JSON error body shared by every structured error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Marker attached to a 500 response so the fault translation stage can
/// report it and decide how much to reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub message: String,
    pub kind: FaultKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Error,
    Panic,
}

impl FaultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultKind::Error => "error",
            FaultKind::Panic => "panic",
        }
    }
}

impl Fault {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FaultKind::Error,
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FaultKind::Panic,
        }
    }
}

/// Production-safe 500 response carrying the fault as an extension.
impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        let body = ErrorBody::new(GENERIC_FAULT_MESSAGE).with_detail(GENERIC_FAULT_MESSAGE);
        let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    /// Unexpected failure; rendered by the fault translation stage.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl Display) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response()
            }
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found"))).into_response()
            }
            ApiError::Internal(message) => Fault::error(message).into_response(),
        }
    }
}

/// Fatal problems while composing the application.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid CORS {kind} {value:?}")]
    InvalidCors { kind: &'static str, value: String },
}
