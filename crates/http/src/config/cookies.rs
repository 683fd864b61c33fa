//! Cookie attributes for the server credential store

use portal_core::TokenKind;
use serde::{Deserialize, Serialize};

/// Attributes applied to every credential cookie
///
/// One lifetime pair serves both the refresh path and the token-pair endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Add the `Secure` attribute; enable in production
    pub secure: bool,
    /// Cookie `Path`
    pub path: String,
    /// Access token max-age in seconds
    pub access_max_age_secs: u64,
    /// Refresh token max-age in seconds
    pub refresh_max_age_secs: u64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: false,
            path: "/".to_string(),
            access_max_age_secs: 15 * 60,           // 15 minutes
            refresh_max_age_secs: 30 * 24 * 60 * 60, // 30 days
        }
    }
}

impl CookieConfig {
    pub const fn max_age(&self, kind: TokenKind) -> u64 {
        match kind {
            TokenKind::Access => self.access_max_age_secs,
            TokenKind::Refresh => self.refresh_max_age_secs,
        }
    }
}
