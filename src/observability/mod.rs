//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     → logging.rs (console + rotation.rs size-capped file)
//!     → reporting.rs (optional Sentry client)
//!     → metrics.rs (optional Prometheus exporter)
//!
//! Per request:
//!     → tracing spans from the HTTP trace layer
//!     → faults forwarded to the ErrorReporter
//!     → counters for rate limiting and faults
//! ```

pub mod logging;
pub mod metrics;
pub mod reporting;
pub mod rotation;

pub use logging::{configure_logging, LoggingError, LoggingGuard};
pub use reporting::{init_reporting, ErrorReporter, NoopReporter, RequestContext, Reporting};
