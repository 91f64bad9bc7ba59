//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query, Upgrade header)
//!     → router.rs (RouteDecision: cluster, upstream, websocket)
//!     → router.rs (UpstreamTargets::url: outbound URL with credential)
//! ```
//!
//! # Design Decisions
//! - Root path goes to the per-cluster RPC host, every other path to the API host
//! - Upgrade requests always go to the cluster root
//! - Deterministic: same input always routes the same way

pub mod router;

pub use router::{RouteDecision, RouteError, Upstream, UpstreamTargets};
