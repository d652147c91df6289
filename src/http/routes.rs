//! Built-in endpoints.
//!
//! Business routers are mounted next to these through
//! [`ApiServer::with_routes`](crate::http::server::ApiServer::with_routes).

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Settings;
use crate::http::error::ApiError;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub openapi_url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: String,
    pub environment: String,
}

pub fn base_routes(settings: &Settings) -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(&settings.app.openapi_url(), get(openapi))
}

async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let app = &state.settings.app;
    Json(ServiceInfo {
        message: format!("{} is running", app.project_name),
        version: app.version.clone(),
        openapi_url: app.openapi_url(),
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        version: state.settings.app.version.clone(),
        environment: state.settings.app.environment.to_string(),
    })
}

async fn openapi(State(state): State<AppState>) -> Json<Value> {
    Json(openapi_document(&state.settings))
}

/// Minimal OpenAPI description of the built-in endpoints.
pub fn openapi_document(settings: &Settings) -> Value {
    json!({
        "openapi": "3.1.0",
        "info": {
            "title": settings.app.project_name,
            "version": settings.app.version,
        },
        "paths": {
            "/": { "get": { "summary": "Service information" } },
            "/health": { "get": { "summary": "Liveness probe" } },
        },
    })
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
