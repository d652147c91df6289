//! Valorix evaluation API: configuration, logging and middleware bootstrap.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::{DerivedConfig, Settings};
pub use http::{ApiError, ApiServer, AppState};
