//! Relay configuration

mod cookies;

pub use cookies::CookieConfig;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relay configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Backend API base URL, without trailing slash
    pub backend_url: String,
    /// Path prefixes (joined to `backend_url`) the relay may forward to
    pub allowed_prefixes: Vec<String>,
    /// Backend endpoint exchanging a refresh token for a new pair
    pub refresh_path: String,
    /// Backend "who am I" endpoint
    pub user_path: String,
    /// Outbound request timeout in seconds
    pub timeout_secs: u64,
    /// Server credential store cookie attributes
    pub cookies: CookieConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            allowed_prefixes: ["/accounts", "/auth", "/groups", "/posts", "/replies"]
                .into_iter()
                .map(String::from)
                .collect(),
            refresh_path: "/auth/token/refresh/".to_string(),
            user_path: "/accounts/user".to_string(),
            timeout_secs: 30,
            cookies: CookieConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Backend base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }

    /// Absolute URL for a backend path
    pub fn backend_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn refresh_url(&self) -> String {
        self.backend_endpoint(&self.refresh_path)
    }

    pub fn user_url(&self) -> String {
        self.backend_endpoint(&self.user_path)
    }

    /// Resolves a relay envelope path to the absolute target URL.
    ///
    /// Absolute URLs are kept as given; anything else is joined to the backend base.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            self.backend_endpoint(path)
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
