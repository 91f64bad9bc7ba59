//! Request inspection.
//!
//! # Responsibilities
//! - Derive the client identity used as the rate-limit key
//! - Read the `x-request-id` set by the server layer
//! - Tell a client-sent request ID apart from a generated one
//!
//! # Design Decisions
//! - The edge network's client-address header wins over the TCP peer,
//!   since behind the edge every peer is the edge itself
//! - Request ID added as early as possible for tracing

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap, HeaderName, Request};

/// Identity used when neither the header nor the peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

pub const X_REQUEST_ID: &str = "x-request-id";

/// Resolve the client identity for rate limiting.
///
/// `identity_header` first, then the peer IP, then [`UNKNOWN_CLIENT`].
pub fn client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    identity_header: &HeaderName,
) -> String {
    headers
        .get(identity_header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Peer address recorded by the server's connect-info layer, if any.
pub fn peer_addr(request: &Request<Body>) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Marks a request whose `x-request-id` came from the client.
#[derive(Debug, Clone, Copy)]
pub struct ClientRequestId;

/// Record whether the client sent its own request ID. Must run before the
/// request-id layer fills in a generated one.
pub async fn mark_client_request_id(mut request: Request<Body>) -> Request<Body> {
    if request.headers().contains_key(X_REQUEST_ID) {
        request.extensions_mut().insert(ClientRequestId);
    }
    request
}

/// Drop an `x-request-id` the gateway generated; keep one the client sent.
pub fn strip_generated_request_id(headers: &mut HeaderMap, extensions: &Extensions) {
    if extensions.get::<ClientRequestId>().is_none() {
        headers.remove(X_REQUEST_ID);
    }
}

/// The request ID set by the request-id layer, or `"-"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}
