//! Startup orchestration.
//!
//! Subsystems initialize in dependency order and any failure is fatal:
//! logging first so later steps are recorded, the listener last so traffic
//! only arrives once the application is assembled.

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::http::{ApiServer, BootstrapError};
use crate::lifecycle::signals::wait_for_signal;
use crate::observability::metrics::init_metrics;
use crate::observability::reporting::ReportingError;
use crate::observability::{configure_logging, init_reporting, LoggingError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("error reporting setup failed: {0}")]
    Reporting(#[from] ReportingError),

    #[error("metrics exporter failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Bring the API up and serve until a termination signal arrives.
pub async fn run(settings: Settings) -> Result<(), StartupError> {
    let _logging = configure_logging(&settings)?;

    tracing::info!(
        project = %settings.app.project_name,
        version = %settings.app.version,
        environment = settings.app.environment.as_str(),
        "Starting up"
    );
    tracing::info!(
        bind_address = %settings.server.bind_address,
        request_timeout_secs = settings.server.request_timeout_secs,
        rate_limit_rps = settings.rate_limit.requests_per_second,
        rate_limit_burst = settings.rate_limit.burst_size,
        "Configuration loaded"
    );

    if settings.app.environment.is_production() && settings.security.uses_default_secret() {
        tracing::warn!("SECRET_KEY is the built-in default; set a real key in production");
    }

    let reporting = init_reporting(&settings)?;

    if settings.metrics.enabled {
        init_metrics(settings.metrics.address)?;
    }

    let address = settings.server.bind_address;
    let server = ApiServer::new(settings, reporting.reporter())?;

    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let shutdown = async {
        if let Err(err) = wait_for_signal().await {
            tracing::error!(error = %err, "Failed to listen for shutdown signals");
            std::future::pending::<()>().await;
        }
    };

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
