//! Per-request pipeline.
//!
//! ```text
//! CORS headers → preflight? → allow-list → rate limiter → route → dispatch
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::ORIGIN;
use axum::http::{HeaderMap, HeaderName, Method, Request};
use axum::response::Response;

use crate::config::GatewayConfig;
use crate::http::dispatch::{DispatchSetupError, Dispatcher};
use crate::http::request::{client_identity, peer_addr, request_id};
use crate::http::response::{preflight, GatewayError};
use crate::observability::metrics;
use crate::routing::{RouteDecision, Upstream};
use crate::security::rate_limit::unix_now;
use crate::security::{Allowlist, CorsPolicy, Decision, RateLimiter};
use crate::store::{KvStore, WindowCounterStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub cors: Arc<CorsPolicy>,
    pub allowlist: Arc<Allowlist>,
    pub limiter: RateLimiter,
    pub dispatcher: Dispatcher,
    pub default_cluster: Arc<str>,
    pub identity_header: HeaderName,
}

impl AppState {
    /// Wire the pipeline from config over the given counter store.
    pub fn new(config: &GatewayConfig, store: Arc<dyn KvStore>) -> Result<Self, DispatchSetupError> {
        let counters = WindowCounterStore::new(
            store,
            std::time::Duration::from_secs(config.rate_limit.counter_ttl_secs),
        );

        // Validation guarantees a legal header name; fall back to the default anyway.
        let identity_header = HeaderName::from_bytes(config.security.client_ip_header.as_bytes())
            .unwrap_or_else(|_| HeaderName::from_static("cf-connecting-ip"));

        Ok(Self {
            cors: Arc::new(CorsPolicy::new(config.cors.allowed_origins.as_deref())),
            allowlist: Arc::new(Allowlist::new(&config.rate_limit.allowlist)),
            limiter: RateLimiter::from_config(counters, &config.rate_limit),
            dispatcher: Dispatcher::new(&config.upstream, &config.security)?,
            default_cluster: Arc::from(config.upstream.default_cluster.as_str()),
            identity_header,
        })
    }

    /// Run allow-list and rate limiter for `client`.
    async fn admit(&self, client: &str) -> Result<(), GatewayError> {
        if self.allowlist.bypasses(client) {
            tracing::debug!(client, "Allow-listed client, skipping rate limit");
            metrics::record_allowlist_bypass();
            return Ok(());
        }

        match self.limiter.check(client, unix_now()).await {
            Ok(Decision::Admitted { .. }) => Ok(()),
            Ok(Decision::Limited { key, count }) => {
                tracing::warn!(client, key = %key, count, "Rate limit exceeded");
                metrics::record_rate_limited();
                Err(GatewayError::RateLimitExceeded)
            }
            Err(e) => {
                tracing::error!(client, error = %e, "Counter store failure, rejecting request");
                metrics::record_store_error();
                Err(e.into())
            }
        }
    }

    async fn process(
        &self,
        client: &str,
        request: Request<Body>,
        cors: HeaderMap,
    ) -> Result<(Response, Upstream), GatewayError> {
        self.admit(client).await?;

        let decision = RouteDecision::from_parts(
            request.uri().path(),
            request.uri().query(),
            request.headers(),
            &self.default_cluster,
        )?;

        tracing::debug!(
            client,
            cluster = %decision.cluster,
            upstream = decision.upstream.as_str(),
            websocket = decision.websocket,
            "Dispatching request"
        );

        let response = self.dispatcher.dispatch(&decision, request, cors).await?;
        Ok((response, decision.upstream))
    }
}

/// Entry point for every inbound request.
pub async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let cors = state.cors.headers(request.headers().get(ORIGIN));

    if method == Method::OPTIONS {
        return preflight(cors);
    }

    let client = client_identity(request.headers(), peer_addr(&request), &state.identity_header);
    let id = request_id(request.headers()).to_string();

    match state.process(&client, request, cors.clone()).await {
        Ok((response, upstream)) => {
            metrics::record_request(method.as_str(), response.status().as_u16(), upstream.as_str(), start);
            response
        }
        Err(e) => {
            if matches!(e, GatewayError::Upstream(_) | GatewayError::Upgrade(_)) {
                tracing::error!(request_id = %id, client = %client, error = %e, "Upstream error");
            }
            let response = e.respond(cors);
            metrics::record_request(method.as_str(), response.status().as_u16(), "none", start);
            response
        }
    }
}
