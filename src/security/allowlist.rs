//! Trusted client identities that bypass rate limiting.

use std::collections::HashSet;

/// A fixed set of client identities exempt from the rate limiter.
///
/// An empty list never bypasses.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    identities: HashSet<String>,
}

impl Allowlist {
    pub fn new<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            identities: identities
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// True if `client` skips the rate limiter.
    pub fn bypasses(&self, client: &str) -> bool {
        self.identities.contains(client)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
