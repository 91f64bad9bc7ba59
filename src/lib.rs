//! Edge gateway for a JSON-RPC/HTTP API.
//!
//! Per-client windowed rate limiting, origin-based CORS, and cluster-aware
//! forwarding of HTTP and WebSocket traffic to the upstream hosts.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod store;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
