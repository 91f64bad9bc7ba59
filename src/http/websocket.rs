//! Upgrade passthrough.
//!
//! # Responsibilities
//! - Replay the client's upgrade handshake against the cluster host
//! - Hand the upstream `101` back to the client
//! - Splice the two upgraded connections together
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Proxy ←──── raw bytes ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - Frames are never parsed; whatever protocol `Upgrade` names is carried
//! - Client headers are forwarded as-is except `Host`, which must name the
//!   upstream, and a request ID the gateway generated itself
//! - A request body, if any, is forwarded under the same size limit
//! - A non-101 upstream answer is relayed verbatim, headers included

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use hyper_util::rt::TokioIo;

use crate::http::dispatch::{read_body, Dispatcher};
use crate::http::request::strip_generated_request_id;
use crate::http::response::GatewayError;
use crate::observability::metrics;

impl Dispatcher {
    pub(crate) async fn forward_upgrade(
        &self,
        url: &str,
        mut request: Request<Body>,
    ) -> Result<Response, GatewayError> {
        let client_upgrade = hyper::upgrade::on(&mut request);
        let (mut parts, body) = request.into_parts();
        parts.headers.remove(HOST);
        strip_generated_request_id(&mut parts.headers, &parts.extensions);
        let body = read_body(body, self.max_body_size()).await?;

        let mut outbound = self.upgrade.request(parts.method, url).headers(parts.headers);
        if !body.is_empty() {
            outbound = outbound.body(body);
        }

        let upstream = outbound
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(e.without_url()))?;

        let status = upstream.status();
        let headers = upstream.headers().clone();

        if status != StatusCode::SWITCHING_PROTOCOLS {
            tracing::warn!(status = %status, "Upstream refused upgrade");
            metrics::record_websocket_upgrade("refused");
            let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            return Ok(response);
        }

        let upstream_io = upstream
            .upgrade()
            .await
            .map_err(|e| GatewayError::Upgrade(e.without_url().to_string()))?;
        metrics::record_websocket_upgrade("switched");

        tokio::spawn(async move {
            let client_io = match client_upgrade.await {
                Ok(upgraded) => upgraded,
                Err(e) => {
                    tracing::warn!(error = %e, "Client upgrade failed");
                    return;
                }
            };

            let mut client_io = TokioIo::new(client_io);
            let mut upstream_io = upstream_io;
            match tokio::io::copy_bidirectional(&mut client_io, &mut upstream_io).await {
                Ok((to_upstream, to_client)) => {
                    tracing::debug!(to_upstream, to_client, "Upgraded connection closed");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Upgraded connection ended with error");
                }
            }
        });

        let mut response = Response::new(Body::empty());
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
