//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → handler.rs (CORS → allow-list → rate limit → route)
//!     → dispatch.rs (plain HTTP forward) | websocket.rs (upgrade splice)
//!     → response.rs (status mapping, CORS header set)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use dispatch::Dispatcher;
pub use handler::AppState;
pub use request::{client_identity, X_REQUEST_ID};
pub use response::GatewayError;
pub use server::HttpServer;
