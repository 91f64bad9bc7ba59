//! Gateway errors and the responses built from them.
//!
//! # Responsibilities
//! - Map every gateway failure to a status code and short body
//! - Replace response headers with the CORS fragment
//!
//! # Design Decisions
//! - Every response the gateway builds itself carries the CORS headers
//! - Counter store outages fail closed with 503
//! - Upstream error statuses are relayed, not mapped; only a missing
//!   upstream response becomes 502

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use thiserror::Error;

use crate::routing::RouteError;
use crate::store::StoreError;

/// Failures that end a request inside the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upgrade failed: {0}")]
    Upgrade(String),

    #[error("request body too large")]
    BodyTooLarge,

    #[error("failed to read request body: {0}")]
    BodyRead(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Route(_) | GatewayError::BodyRead(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) | GatewayError::Upgrade(_) => StatusCode::BAD_GATEWAY,
            GatewayError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn body(&self) -> &'static str {
        match self {
            GatewayError::RateLimitExceeded => "Rate limit exceeded",
            GatewayError::Store(_) => "Rate limit store unavailable",
            GatewayError::Route(_) => "Invalid cluster",
            GatewayError::Upstream(_) => "Upstream request failed",
            GatewayError::Upgrade(_) => "Upstream upgrade failed",
            GatewayError::BodyTooLarge => "Request body too large",
            GatewayError::BodyRead(_) => "Invalid request body",
        }
    }

    /// Build the client response, carrying `cors`.
    pub fn respond(self, cors: HeaderMap) -> Response {
        with_cors(self.status(), Body::from(self.body()), cors)
    }
}

/// A response with exactly `headers` as its header set.
pub fn with_cors(status: StatusCode, body: Body, headers: HeaderMap) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Answer to a CORS preflight: 200, no body, CORS headers only.
pub fn preflight(cors: HeaderMap) -> Response {
    with_cors(StatusCode::OK, Body::empty(), cors)
}
