//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file + process environment
//!     → loader.rs (typed parse, fail fast on malformed values)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → derived.rs (middleware / database / cache / external services views)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; there is no reload
//! - All fields have defaults so an empty environment runs in development
//! - Validation separates syntactic (loader) from semantic checks

pub mod derived;
pub mod loader;
pub mod schema;
pub mod validation;

pub use derived::DerivedConfig;
pub use loader::ConfigError;
pub use schema::{Environment, LogLevel, Secret, Settings};
