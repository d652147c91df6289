//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber exactly once
//! - Write to two sinks: console and a size-rotated file
//! - Raise framework verbosity in development only
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured directives when set
//! - File output goes through a non-blocking worker; the returned guard
//!   flushes it on drop

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Settings;
use crate::observability::rotation::SizeRotatingFile;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Framework targets made chattier while developing.
const DEVELOPMENT_DIRECTIVES: [&str; 3] = ["tower_http=debug", "axum=debug", "hyper=info"];

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("tracing subscriber error: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Keeps the file writer alive. Drop it only at shutdown.
#[must_use = "Dropping this handle stops the background log writer."]
#[derive(Debug)]
pub struct LoggingGuard {
    file: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// Whether this call installed the sinks (as opposed to a repeat call).
    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }
}

/// Filter directives derived from the settings.
pub fn filter_directives(settings: &Settings) -> String {
    let mut directives = vec![settings.logging.level.directive()];
    if settings.app.environment.is_development() {
        directives.extend(DEVELOPMENT_DIRECTIVES);
    }
    directives.join(",")
}

/// Install the console and rotating file sinks.
///
/// Repeated calls are no-ops returning an inactive guard.
pub fn configure_logging(settings: &Settings) -> Result<LoggingGuard, LoggingError> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        tracing::debug!("Logging already configured");
        return Ok(LoggingGuard { file: None });
    }

    let result = install(settings);
    if result.is_err() {
        INSTALLED.store(false, Ordering::SeqCst);
    }
    result
}

fn install(settings: &Settings) -> Result<LoggingGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directives(settings))?,
    };

    let logging = &settings.logging;
    let file = SizeRotatingFile::open(&logging.file, logging.max_file_bytes, logging.backup_count)
        .map_err(|source| LoggingError::LogFile {
            path: logging.file.clone(),
            source,
        })?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;

    tracing::info!(
        level = ?logging.level,
        file = %logging.file.display(),
        environment = %settings.app.environment,
        "Logging configured"
    );

    Ok(LoggingGuard { file: Some(guard) })
}
