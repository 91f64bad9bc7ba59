//! Environment variable overrides.
//!
//! Edge deployments hand the gateway its settings through the environment.
//! Every variable is optional. A numeric variable that is set but empty or
//! not a positive integer resets its setting to the documented default and
//! logs a warning.

use crate::config::schema::{GatewayConfig, StoreBackend, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS};

pub const CORS_ALLOW_ORIGIN: &str = "CORS_ALLOW_ORIGIN";
pub const UPSTREAM_API_KEY: &str = "UPSTREAM_API_KEY";
pub const RATE_LIMIT_MAX_REQUESTS: &str = "RATE_LIMIT_MAX_REQUESTS";
pub const RATE_LIMIT_WINDOW_SECONDS: &str = "RATE_LIMIT_WINDOW_SECONDS";
pub const RATE_LIMIT_ALLOWLIST: &str = "RATE_LIMIT_ALLOWLIST";
pub const RATE_LIMIT_REDIS_URL: &str = "RATE_LIMIT_REDIS_URL";
pub const BIND_ADDRESS: &str = "BIND_ADDRESS";

/// Apply overrides from the process environment.
pub fn apply_process_env(config: &mut GatewayConfig) {
    apply_env(config, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` to resolve variable names.
pub fn apply_env<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(origins) = lookup(CORS_ALLOW_ORIGIN) {
        config.cors.allowed_origins = Some(split_list(&origins));
    }

    if let Some(key) = lookup(UPSTREAM_API_KEY) {
        config.upstream.api_key = key.trim().to_string();
    }

    if let Some(raw) = lookup(RATE_LIMIT_MAX_REQUESTS) {
        config.rate_limit.max_requests =
            parse_positive(RATE_LIMIT_MAX_REQUESTS, &raw).unwrap_or(DEFAULT_MAX_REQUESTS);
    }

    if let Some(raw) = lookup(RATE_LIMIT_WINDOW_SECONDS) {
        config.rate_limit.window_secs =
            parse_positive(RATE_LIMIT_WINDOW_SECONDS, &raw).unwrap_or(DEFAULT_WINDOW_SECS);
    }

    if let Some(list) = lookup(RATE_LIMIT_ALLOWLIST) {
        config.rate_limit.allowlist = split_list(&list);
    }

    if let Some(url) = lookup(RATE_LIMIT_REDIS_URL) {
        let url = url.trim();
        if !url.is_empty() {
            config.store.backend = StoreBackend::Redis;
            config.store.redis_url = Some(url.to_string());
        }
    }

    if let Some(addr) = lookup(BIND_ADDRESS) {
        let addr = addr.trim();
        if !addr.is_empty() {
            config.listener.bind_address = addr.to_string();
        }
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_positive(name: &str, raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            tracing::warn!(variable = name, value = raw, "Ignoring invalid numeric setting, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = GatewayConfig::default();
        apply_env(
            &mut config,
            lookup_from(&[
                (CORS_ALLOW_ORIGIN, "*.example.com, app.test ,"),
                (UPSTREAM_API_KEY, "secret"),
                (RATE_LIMIT_MAX_REQUESTS, "10"),
                (RATE_LIMIT_WINDOW_SECONDS, "5"),
                (RATE_LIMIT_ALLOWLIST, "1.2.3.4,5.6.7.8"),
                (RATE_LIMIT_REDIS_URL, "redis://cache:6379"),
            ]),
        );

        assert_eq!(
            config.cors.allowed_origins,
            Some(vec!["*.example.com".to_string(), "app.test".to_string()])
        );
        assert_eq!(config.upstream.api_key, "secret");
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window_secs, 5);
        assert_eq!(config.rate_limit.allowlist.len(), 2);
        assert_eq!(config.store.backend, StoreBackend::Redis);
    }

    #[test]
    fn test_non_numeric_falls_back() {
        // Values from a config file are not kept when the variable is invalid.
        let mut config = GatewayConfig::default();
        config.rate_limit.max_requests = 7;
        config.rate_limit.window_secs = 9;
        apply_env(
            &mut config,
            lookup_from(&[
                (RATE_LIMIT_MAX_REQUESTS, "lots"),
                (RATE_LIMIT_WINDOW_SECONDS, "0"),
            ]),
        );

        assert_eq!(config.rate_limit.max_requests, 50);
        assert_eq!(config.rate_limit.window_secs, 1);
    }

    #[test]
    fn test_unset_numeric_keeps_file_value() {
        let mut config = GatewayConfig::default();
        config.rate_limit.max_requests = 7;
        apply_env(&mut config, |_| None);
        assert_eq!(config.rate_limit.max_requests, 7);
    }

    #[test]
    fn test_absent_env_keeps_allow_all_cors() {
        let mut config = GatewayConfig::default();
        apply_env(&mut config, |_| None);
        assert!(config.cors.allowed_origins.is_none());
        assert!(config.rate_limit.allowlist.is_empty());
    }
}
