//! HTTP application subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, connect info, graceful drain)
//!     → pipeline.rs (security headers, redirect, ids, hosts, CORS,
//!                    rate limit, fault translation, timeout, body limit)
//!     → routes.rs (/, /health, OpenAPI, business routers)
//!     → fault.rs (500 rewrite and reporting on the way out)
//! ```

pub mod error;
pub mod fault;
pub mod pipeline;
pub mod routes;
pub mod server;

pub use error::{ApiError, BootstrapError, ErrorBody};
pub use pipeline::Stage;
pub use server::{ApiServer, AppState};
