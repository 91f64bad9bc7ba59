//! Upstream selection and URL rewriting.
//!
//! # Responsibilities
//! - Pick the upstream for a request from its path, `cluster` parameter and
//!   upgrade header
//! - Build the outbound URL with the credential and the original query
//!
//! # Design Decisions
//! - Decisions are pure functions of the request; no state
//! - The original query string is appended byte-for-byte, never re-encoded
//! - Cluster names end up in a hostname, so only DNS label characters pass

use axum::http::header::UPGRADE;
use axum::http::HeaderMap;
use thiserror::Error;

use crate::config::UpstreamConfig;

/// Query parameter naming the cluster.
pub const CLUSTER_PARAM: &str = "cluster";
/// Query parameter carrying the upstream credential.
pub const API_KEY_PARAM: &str = "api-key";

/// Which upstream host serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// The per-cluster RPC host.
    Cluster,
    /// The fixed REST API host.
    Api,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Cluster => "cluster",
            Upstream::Api => "api",
        }
    }
}

/// Errors raised while routing a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid cluster name '{0}'")]
    InvalidCluster(String),
}

/// Where and how a request is forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub cluster: String,
    pub upstream: Upstream,
    /// The request asks for a protocol upgrade and is passed through raw.
    pub websocket: bool,
}

impl RouteDecision {
    /// Route a request by path, query string and headers.
    pub fn from_parts(
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        default_cluster: &str,
    ) -> Result<Self, RouteError> {
        let cluster = cluster_param(query).unwrap_or_else(|| default_cluster.to_string());
        if !is_cluster_name(&cluster) {
            return Err(RouteError::InvalidCluster(cluster));
        }

        let websocket = is_upgrade(headers);
        let upstream = if websocket || path == "/" {
            Upstream::Cluster
        } else {
            Upstream::Api
        };

        Ok(Self {
            cluster,
            upstream,
            websocket,
        })
    }
}

/// Any non-empty `Upgrade` header counts, whatever protocol it names.
pub fn is_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(UPGRADE)
        .map(|v| !v.as_bytes().is_empty())
        .unwrap_or(false)
}

fn cluster_param(query: Option<&str>) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == CLUSTER_PARAM)
        .map(|(_, v)| v.into_owned())
}

fn is_cluster_name(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Upstream base URLs and credential.
#[derive(Debug, Clone)]
pub struct UpstreamTargets {
    cluster_url_template: String,
    api_url: String,
    api_key: String,
}

impl UpstreamTargets {
    pub fn new(
        cluster_url_template: impl Into<String>,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            cluster_url_template: cluster_url_template.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(&config.cluster_url_template, &config.api_url, &config.api_key)
    }

    /// Base URL of the RPC host for `cluster`, without a trailing slash.
    pub fn cluster_base(&self, cluster: &str) -> String {
        self.cluster_url_template.replace("{cluster}", cluster)
    }

    /// Full outbound URL for a routed request.
    ///
    /// Upgrade requests go to the cluster root with only the credential.
    /// Everything else carries the credential first, then the inbound query.
    pub fn url(&self, decision: &RouteDecision, path: &str, query: Option<&str>) -> String {
        let credential = format!("{}={}", API_KEY_PARAM, self.api_key);

        if decision.websocket {
            return format!("{}/?{}", self.cluster_base(&decision.cluster), credential);
        }

        let extra = match query {
            Some(q) if !q.is_empty() => format!("&{}", q),
            _ => String::new(),
        };

        match decision.upstream {
            Upstream::Cluster => format!(
                "{}/?{}{}",
                self.cluster_base(&decision.cluster),
                credential,
                extra
            ),
            Upstream::Api => format!("{}{}?{}{}", self.api_url, path, credential, extra),
        }
    }
}
