//! Configuration validation.
//!
//! # Responsibilities
//! - Fall back to documented defaults for numeric settings that make no sense
//! - Validate addresses and upstream URLs
//! - Report every problem at once, not just the first
//!
//! # Design Decisions
//! - Defaulting never fails: a zero window or limit is replaced and logged
//! - Window and counter expiry are capped so deadlines stay representable
//! - Validation is a pure function: &GatewayConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::{
    GatewayConfig, StoreBackend, DEFAULT_COUNTER_TTL_SECS, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS,
    MAX_WINDOW_SECS,
};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("{field} '{value}' is not an absolute http(s) URL")]
    UpstreamUrl { field: &'static str, value: String },

    #[error("store.redis_url is required when store.backend = \"redis\"")]
    MissingRedisUrl,

    #[error("{field} '{value}' is not a valid HTTP header")]
    Header { field: &'static str, value: String },
}

/// Replace nonsensical numeric settings with their defaults.
pub fn apply_defaults(config: &mut GatewayConfig) {
    let limits = &mut config.rate_limit;

    if limits.max_requests == 0 {
        tracing::warn!(default = DEFAULT_MAX_REQUESTS, "rate_limit.max_requests is zero, using default");
        limits.max_requests = DEFAULT_MAX_REQUESTS;
    }

    if limits.window_secs == 0 {
        tracing::warn!(default = DEFAULT_WINDOW_SECS, "rate_limit.window_secs is zero, using default");
        limits.window_secs = DEFAULT_WINDOW_SECS;
    }

    if limits.window_secs > MAX_WINDOW_SECS {
        tracing::warn!(
            window_secs = limits.window_secs,
            max = MAX_WINDOW_SECS,
            "rate_limit.window_secs too large, capping it"
        );
        limits.window_secs = MAX_WINDOW_SECS;
    }

    if limits.counter_ttl_secs == 0 {
        limits.counter_ttl_secs = DEFAULT_COUNTER_TTL_SECS;
    }

    if limits.counter_ttl_secs > MAX_WINDOW_SECS {
        tracing::warn!(
            counter_ttl_secs = limits.counter_ttl_secs,
            max = MAX_WINDOW_SECS,
            "rate_limit.counter_ttl_secs too large, capping it"
        );
        limits.counter_ttl_secs = MAX_WINDOW_SECS;
    }

    // A counter must never expire while its window is still open.
    if limits.counter_ttl_secs < limits.window_secs {
        tracing::warn!(
            counter_ttl_secs = limits.counter_ttl_secs,
            window_secs = limits.window_secs,
            "Counter TTL shorter than the window, raising it"
        );
        limits.counter_ttl_secs = limits.window_secs;
    }

    if config.store.sweep_interval_secs == 0 {
        config.store.sweep_interval_secs = 30;
    }

    if config.upstream.default_cluster.trim().is_empty() {
        config.upstream.default_cluster = "mainnet".to_string();
    }
}

/// Check the configuration for problems that cannot be defaulted.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    // The template is checked with a placeholder cluster substituted in.
    let cluster_probe = config
        .upstream
        .cluster_url_template
        .replace("{cluster}", &config.upstream.default_cluster);
    if !is_http_url(&cluster_probe) {
        errors.push(ValidationError::UpstreamUrl {
            field: "upstream.cluster_url_template",
            value: config.upstream.cluster_url_template.clone(),
        });
    }

    if !is_http_url(&config.upstream.api_url) {
        errors.push(ValidationError::UpstreamUrl {
            field: "upstream.api_url",
            value: config.upstream.api_url.clone(),
        });
    }

    if config.store.backend == StoreBackend::Redis
        && config.store.redis_url.as_deref().map_or(true, str::is_empty)
    {
        errors.push(ValidationError::MissingRedisUrl);
    }

    if HeaderName::from_bytes(config.security.client_ip_header.as_bytes()).is_err() {
        errors.push(ValidationError::Header {
            field: "security.client_ip_header",
            value: config.security.client_ip_header.clone(),
        });
    }

    if HeaderName::from_bytes(config.upstream.marker_header.as_bytes()).is_err()
        || HeaderValue::from_str(&config.upstream.marker_value).is_err()
    {
        errors.push(ValidationError::Header {
            field: "upstream.marker_header",
            value: config.upstream.marker_header.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_values_defaulted() {
        let mut config = GatewayConfig::default();
        config.rate_limit.max_requests = 0;
        config.rate_limit.window_secs = 0;
        config.rate_limit.counter_ttl_secs = 0;

        apply_defaults(&mut config);

        assert_eq!(config.rate_limit.max_requests, 50);
        assert_eq!(config.rate_limit.window_secs, 1);
        assert_eq!(config.rate_limit.counter_ttl_secs, 60);
    }

    #[test]
    fn test_ttl_raised_to_window() {
        let mut config = GatewayConfig::default();
        config.rate_limit.window_secs = 120;
        config.rate_limit.counter_ttl_secs = 60;

        apply_defaults(&mut config);

        assert_eq!(config.rate_limit.counter_ttl_secs, 120);
    }

    #[test]
    fn test_huge_window_capped() {
        let mut config = GatewayConfig::default();
        config.rate_limit.window_secs = u64::MAX;
        config.rate_limit.counter_ttl_secs = u64::MAX;

        apply_defaults(&mut config);

        assert_eq!(config.rate_limit.window_secs, MAX_WINDOW_SECS);
        assert_eq!(config.rate_limit.counter_ttl_secs, MAX_WINDOW_SECS);
    }

    #[test]
    fn test_all_errors_reported() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-addr".into();
        config.upstream.api_url = "ftp://api.example.com".into();
        config.store.backend = StoreBackend::Redis;
        config.security.client_ip_header = "bad header".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::MissingRedisUrl));
    }

    #[test]
    fn test_fixed_cluster_host_allowed() {
        let mut config = GatewayConfig::default();
        config.upstream.cluster_url_template = "http://127.0.0.1:8899".into();
        assert!(validate_config(&config).is_ok());
    }
}
