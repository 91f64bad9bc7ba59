//! Outbound request construction and relay.
//!
//! # Responsibilities
//! - Rewrite an admitted request onto the routed upstream URL
//! - Send it with the gateway's own headers, not the client's
//! - Relay upstream status and body under the CORS header set
//!
//! # Design Decisions
//! - Bodies are buffered (JSON-RPC payloads are small and bounded by
//!   `security.max_body_size`); responses are streamed
//! - An empty inbound body is sent as no body at all
//! - Only crossing the size limit is a 413; other read failures are a 400
//! - Upstream response headers are dropped, including `Content-Type`
//! - Dropping the handler future drops the in-flight upstream call

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use axum::response::Response;
use futures_util::StreamExt;
use thiserror::Error;

use crate::config::{SecurityConfig, UpstreamConfig};
use crate::http::response::{with_cors, GatewayError};
use crate::routing::{RouteDecision, UpstreamTargets};

/// Errors raised while building a dispatcher at startup.
#[derive(Debug, Error)]
pub enum DispatchSetupError {
    #[error("invalid marker header '{0}'")]
    MarkerHeader(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Forwards admitted requests to the upstream hosts.
#[derive(Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    /// HTTP/1.1-only client; upgrades are not possible over HTTP/2.
    pub(super) upgrade: reqwest::Client,
    targets: UpstreamTargets,
    marker_name: HeaderName,
    marker_value: HeaderValue,
    max_body_size: usize,
}

impl Dispatcher {
    pub fn new(upstream: &UpstreamConfig, security: &SecurityConfig) -> Result<Self, DispatchSetupError> {
        let marker_name = HeaderName::from_bytes(upstream.marker_header.as_bytes())
            .map_err(|_| DispatchSetupError::MarkerHeader(upstream.marker_header.clone()))?;
        let marker_value = HeaderValue::from_str(&upstream.marker_value)
            .map_err(|_| DispatchSetupError::MarkerHeader(upstream.marker_value.clone()))?;

        let connect_timeout = Duration::from_secs(upstream.connect_timeout_secs.max(1));
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        let upgrade = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .http1_only()
            .build()?;

        Ok(Self {
            http,
            upgrade,
            targets: UpstreamTargets::from_config(upstream),
            marker_name,
            marker_value,
            max_body_size: security.max_body_size,
        })
    }

    pub fn targets(&self) -> &UpstreamTargets {
        &self.targets
    }

    pub(super) fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Forward `request` according to `decision`.
    pub async fn dispatch(
        &self,
        decision: &RouteDecision,
        request: Request<Body>,
        cors: HeaderMap,
    ) -> Result<Response, GatewayError> {
        let url = self
            .targets
            .url(decision, request.uri().path(), request.uri().query());

        if decision.websocket {
            return self.forward_upgrade(&url, request).await;
        }

        self.forward_http(&url, request, cors).await
    }

    async fn forward_http(
        &self,
        url: &str,
        request: Request<Body>,
        cors: HeaderMap,
    ) -> Result<Response, GatewayError> {
        let (parts, body) = request.into_parts();
        let body = read_body(body, self.max_body_size).await?;

        let mut outbound = self
            .http
            .request(parts.method, url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(self.marker_name.clone(), self.marker_value.clone());
        if !body.is_empty() {
            outbound = outbound.body(body);
        }

        // reqwest errors embed the URL, which carries the credential.
        let upstream = outbound
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(e.without_url()))?;
        let status = upstream.status();
        tracing::debug!(status = %status, "Upstream responded");

        Ok(with_cors(status, Body::from_stream(upstream.bytes_stream()), cors))
    }
}

/// Buffer an inbound body of at most `limit` bytes.
pub(super) async fn read_body(body: Body, limit: usize) -> Result<Bytes, GatewayError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| GatewayError::BodyRead(e.to_string()))?;
        if buf.len() + chunk.len() > limit {
            return Err(GatewayError::BodyTooLarge);
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunked(chunks: Vec<Result<&'static str, std::io::Error>>) -> Body {
        Body::from_stream(stream::iter(
            chunks.into_iter().map(|c| c.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    #[tokio::test]
    async fn test_body_within_limit() {
        let body = chunked(vec![Ok("{\"id\":"), Ok("1}")]);
        assert_eq!(&read_body(body, 16).await.unwrap()[..], b"{\"id\":1}");
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let body = chunked(vec![Ok("0123456789"), Ok("0123456789")]);
        assert!(matches!(read_body(body, 16).await, Err(GatewayError::BodyTooLarge)));
    }

    #[tokio::test]
    async fn test_aborted_body_is_not_too_large() {
        let body = chunked(vec![Ok("{\"id\""), Err(std::io::Error::other("connection reset"))]);
        assert!(matches!(read_body(body, 1024).await, Err(GatewayError::BodyRead(_))));
    }
}
