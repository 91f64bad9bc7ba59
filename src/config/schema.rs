//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream hosts and credential.
    pub upstream: UpstreamConfig,

    /// CORS origin policy.
    pub cors: CorsConfig,

    /// Windowed rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Backing key-value store for window counters.
    pub store: StoreConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream RPC and API hosts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Credential appended to every upstream URL as `api-key`.
    pub api_key: String,

    /// Base URL of the per-cluster RPC host. `{cluster}` is replaced with
    /// the requested cluster name.
    pub cluster_url_template: String,

    /// Base URL of the secondary REST API host. Non-root paths go here.
    pub api_url: String,

    /// Cluster used when the request carries no `cluster` parameter.
    pub default_cluster: String,

    /// Header attached to every outbound HTTP call.
    pub marker_header: String,

    /// Value of the marker header.
    pub marker_value: String,

    /// TCP connect timeout for upstream calls, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            cluster_url_template: "https://{cluster}.helius-rpc.com".to_string(),
            api_url: "https://api.helius.xyz".to_string(),
            default_cluster: "mainnet".to_string(),
            marker_header: "x-rpc-edge-proxy".to_string(),
            marker_value: "true".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origin patterns. `None` allows every origin.
    pub allowed_origins: Option<Vec<String>>,
}

/// Default maximum requests per window.
pub const DEFAULT_MAX_REQUESTS: u64 = 50;
/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 1;
/// Default counter expiry in seconds.
pub const DEFAULT_COUNTER_TTL_SECS: u64 = 60;
/// Upper bound for the window length and the counter expiry (30 days).
pub const MAX_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Read a count that falls back to its default when it is not a
/// non-negative integer. Yields zero in that case, which `apply_defaults`
/// replaces with the documented default.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Count(u64),
        Other(toml::Value),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Count(value) => Ok(value),
        Raw::Other(value) => {
            tracing::warn!(value = %value, "Ignoring invalid numeric setting, using default");
            Ok(0)
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per client per window.
    #[serde(deserialize_with = "lenient_count")]
    pub max_requests: u64,

    /// Window length in seconds.
    #[serde(deserialize_with = "lenient_count")]
    pub window_secs: u64,

    /// Expiry of a window counter in the store. Independent of the window
    /// length but never shorter than it.
    #[serde(deserialize_with = "lenient_count")]
    pub counter_ttl_secs: u64,

    /// Client identities that bypass the limiter.
    pub allowlist: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_secs: DEFAULT_WINDOW_SECS,
            counter_ttl_secs: DEFAULT_COUNTER_TTL_SECS,
            allowlist: Vec::new(),
        }
    }
}

/// Which key-value store holds the window counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map. Counters are per gateway instance.
    #[default]
    Memory,
    /// Shared Redis instance.
    Redis,
}

/// Counter store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Connection URL, required for the redis backend.
    pub redis_url: Option<String>,

    /// How often the memory backend drops expired counters.
    #[serde(deserialize_with = "lenient_count")]
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            redis_url: None,
            sweep_interval_secs: 30,
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,

    /// Header set by the edge network carrying the real client address.
    pub client_ip_header: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            client_ip_header: "cf-connecting-ip".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
