//! Configuration management for the portal daemon

use crate::{DaemonError, Result};
use portal_core::tracing::InstrumentationConfig;
use portal_http::RelayConfig;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// HTTP server configuration
    pub http: HttpConfig,

    /// Relay, allow-list and cookie configuration
    pub relay: RelayConfig,

    /// Log output configuration
    pub log: LogConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Address to bind HTTP server
    pub bind_addr: SocketAddr,
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines
    pub json: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "portal=info,portal_http=info,tower_http=info".to_string(),
            json: false,
        }
    }
}

impl LogConfig {
    pub fn instrumentation(&self) -> InstrumentationConfig {
        InstrumentationConfig {
            service_name: "portal".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: self.level.clone(),
            json: self.json,
        }
    }
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then `PORTAL_*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value does not parse
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("PORTAL")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("relay.allowed_prefixes")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    fn validate(&self) -> Result<()> {
        let base = self.relay.base_url();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(DaemonError::ConfigString(format!(
                "relay.backend_url must be an http(s) URL, got {:?}",
                self.relay.backend_url
            )));
        }
        if self.relay.allowed_prefixes.iter().any(|p| !p.starts_with('/')) {
            return Err(DaemonError::ConfigString(
                "relay.allowed_prefixes entries must start with '/'".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.http.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.relay.backend_url, "http://localhost:8000");
        assert_eq!(config.relay.cookies.access_max_age_secs, 900);
        assert!(!config.log.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            ".toml",
            r#"
[http]
bind_addr = "0.0.0.0:8080"

[relay]
backend_url = "https://api.example.com/"
allowed_prefixes = ["/accounts", "/groups"]

[relay.cookies]
secure = true
"#,
        );

        let config = DaemonConfig::from_file(file.path()).unwrap();
        assert_eq!(config.http.bind_addr.port(), 8080);
        assert_eq!(config.relay.base_url(), "https://api.example.com");
        assert_eq!(config.relay.allowed_prefixes, vec!["/accounts", "/groups"]);
        assert!(config.relay.cookies.secure);
        assert_eq!(config.relay.cookies.refresh_max_age_secs, 2_592_000);
        assert_eq!(config.relay.refresh_path, "/auth/token/refresh/");
    }

    #[test]
    fn test_rejects_non_http_backend() {
        let file = write_config(
            ".toml",
            r#"
[relay]
backend_url = "ftp://files.example.com"
"#,
        );
        assert!(matches!(
            DaemonConfig::from_file(file.path()),
            Err(DaemonError::ConfigString(_))
        ));
    }

    #[test]
    fn test_rejects_relative_prefix() {
        let file = write_config(
            ".yaml",
            "relay:\n  allowed_prefixes:\n    - accounts\n",
        );
        assert!(matches!(
            DaemonConfig::from_file(file.path()),
            Err(DaemonError::ConfigString(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = DaemonConfig::from_file("/nonexistent/portal.toml");
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_log_instrumentation() {
        let log = LogConfig {
            level: "debug".to_string(),
            json: true,
        };
        let instrumentation = log.instrumentation();
        assert_eq!(instrumentation.service_name, "portal");
        assert_eq!(instrumentation.log_level, "debug");
        assert!(instrumentation.json);
    }
}
