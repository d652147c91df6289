//! HTTP server setup.
//!
//! # Responsibilities
//! - Assemble the built-in routes and any business routers
//! - Wrap them in the middleware pipeline planned for the settings
//! - Serve with client addresses attached and drain on shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::http::error::BootstrapError;
use crate::http::pipeline;
use crate::http::routes::{base_routes, not_found};
use crate::observability::ErrorReporter;

/// Application state injected into handlers and stateful middleware.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub reporter: Arc<dyn ErrorReporter>,
}

/// The assembled API application.
pub struct ApiServer {
    router: Router,
    state: AppState,
}

impl ApiServer {
    /// Application with only the built-in endpoints.
    pub fn new(settings: Settings, reporter: Arc<dyn ErrorReporter>) -> Result<Self, BootstrapError> {
        Self::with_routes(settings, reporter, Router::new())
    }

    /// Application with `routes` mounted next to the built-in endpoints.
    pub fn with_routes(
        settings: Settings,
        reporter: Arc<dyn ErrorReporter>,
        routes: Router<AppState>,
    ) -> Result<Self, BootstrapError> {
        let state = AppState {
            settings: Arc::new(settings),
            reporter,
        };

        let stages = pipeline::plan(&state.settings);
        tracing::info!(
            environment = state.settings.app.environment.as_str(),
            stages = ?stages.iter().map(pipeline::Stage::name).collect::<Vec<_>>(),
            "Middleware pipeline planned"
        );

        let app = base_routes(&state.settings)
            .merge(routes)
            .fallback(not_found)
            .with_state(state.clone());
        let router = pipeline::apply(app, &stages, &state)?;

        Ok(Self { router, state })
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// The fully wrapped router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            project = %self.state.settings.app.project_name,
            version = %self.state.settings.app.version,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
