//! Origin validation and CORS response headers.
//!
//! # Responsibilities
//! - Parse configured origin patterns once at startup
//! - Match the request `Origin` against them
//! - Produce the CORS header fragment attached to every gateway response
//!
//! # Design Decisions
//! - Two pattern shapes only: an exact host or a `*.` subdomain wildcard
//! - Matching is anchored and case-sensitive; no regex is built from config text
//! - A non-matching origin only loses `Access-Control-Allow-Origin`; the
//!   browser enforces the rest

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue};

pub const ALLOW_METHODS: &str = "GET, HEAD, POST, PUT, OPTIONS";
pub const ALLOW_HEADERS: &str = "*";

/// Host part of an origin pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    /// Matches exactly this text.
    ExactHost(String),
    /// `*.suffix`: one label of letters, digits and hyphens, then `.suffix`.
    WildcardSubdomain(String),
}

impl HostPattern {
    fn matches(&self, host: &str) -> bool {
        match self {
            HostPattern::ExactHost(expected) => host == expected,
            HostPattern::WildcardSubdomain(suffix) => host
                .strip_suffix(suffix.as_str())
                .and_then(|rest| rest.strip_suffix('.'))
                .map(is_label)
                .unwrap_or(false),
        }
    }
}

fn is_label(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// A single allowed-origin pattern.
///
/// Without a scheme (`*.example.com`) the pattern is compared to the origin
/// with its scheme removed. With one (`https://*.example.com`) it is compared
/// to the whole origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPattern {
    scheme: Option<String>,
    host: HostPattern,
}

impl OriginPattern {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (scheme, host) = match raw.split_once("://") {
            Some((scheme, host)) => (Some(scheme.to_string()), host),
            None => (None, raw),
        };

        let host = match host.strip_prefix("*.") {
            Some(suffix) => HostPattern::WildcardSubdomain(suffix.to_string()),
            None => HostPattern::ExactHost(host.to_string()),
        };

        Self { scheme, host }
    }

    pub fn host(&self) -> &HostPattern {
        &self.host
    }

    pub fn matches(&self, origin: &str) -> bool {
        let host = match (&self.scheme, origin.split_once("://")) {
            (Some(scheme), Some((origin_scheme, rest))) if scheme == origin_scheme => rest,
            (Some(_), _) => return false,
            (None, Some((_, rest))) => rest,
            (None, None) => origin,
        };
        self.host.matches(host)
    }
}

/// The configured origin policy.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    /// `None` means every origin is allowed.
    patterns: Option<Vec<OriginPattern>>,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Option<&[String]>) -> Self {
        Self {
            patterns: allowed_origins
                .map(|list| list.iter().map(|p| OriginPattern::parse(p)).collect()),
        }
    }

    /// Allow every origin.
    pub fn allow_all() -> Self {
        Self { patterns: None }
    }

    /// True if `origin` matches any configured pattern.
    pub fn is_allowed(&self, origin: &str) -> bool {
        match &self.patterns {
            None => true,
            Some(patterns) => patterns.iter().any(|p| p.matches(origin)),
        }
    }

    /// Build the CORS header fragment for a request with the given `Origin`.
    pub fn headers(&self, origin: Option<&HeaderValue>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));

        match (&self.patterns, origin) {
            (None, _) => {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            }
            (Some(_), None) => {}
            (Some(_), Some(value)) => {
                let allowed = value.to_str().map(|o| self.is_allowed(o)).unwrap_or(false);
                if allowed {
                    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value.clone());
                } else {
                    tracing::debug!(origin = ?value, "Origin not in CORS allow list");
                }
            }
        }

        headers
    }
}
