//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → https_redirect.rs (production + FORCE_HTTPS only)
//!     → hosts.rs (Host allow-list, when restricted)
//!     → cors.rs (origin policy, when origins are configured)
//!     → rate_limit.rs (per-client token bucket)
//!     → Pass to routing
//!
//! Outgoing response:
//!     → headers.rs (security header template)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Forwarded headers trusted only from known proxies (forwarded.rs)

pub mod cors;
pub mod forwarded;
pub mod headers;
pub mod hosts;
pub mod https_redirect;
pub mod rate_limit;
