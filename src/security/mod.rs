//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (compute CORS headers; preflight ends here)
//!     → allowlist.rs (trusted clients skip the limiter)
//!     → rate_limit.rs (per-client fixed window)
//!     → Pass to dispatch
//! ```
//!
//! # Design Decisions
//! - CORS headers are computed before any admission decision so every
//!   gateway-built response carries them
//! - Fail closed: a counter store outage rejects the request

pub mod allowlist;
pub mod cors;
pub mod rate_limit;

pub use allowlist::Allowlist;
pub use cors::{CorsPolicy, OriginPattern};
pub use rate_limit::{window_key, Decision, RateLimiter};
