//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Settings → logging → reporting → metrics → app → bind → serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop accepting → drain in-flight requests → exit
//! ```

pub mod signals;
pub mod startup;

pub use startup::{run, StartupError};
