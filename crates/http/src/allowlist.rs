//! Allow-list gate in front of the relay
//!
//! Deny by default: a target is forwarded only when its absolute URL starts
//! with `backend base + prefix` for one of the configured prefixes. The check
//! is a literal prefix match; no normalization, decoding or wildcards.

use crate::config::RelayConfig;

#[derive(Debug, Clone)]
pub struct AllowList {
    allowed: Vec<String>,
}

impl AllowList {
    pub fn new<I, S>(base_url: &str, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = base_url.trim_end_matches('/');
        Self {
            allowed: prefixes
                .into_iter()
                .map(|prefix| format!("{base}{}", prefix.as_ref()))
                .collect(),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.base_url(), &config.allowed_prefixes)
    }

    /// Whether an already-resolved absolute URL may be forwarded
    pub fn is_allowed(&self, url: &str) -> bool {
        self.allowed.iter().any(|prefix| url.starts_with(prefix))
    }
}
