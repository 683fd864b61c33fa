//! Common types used by both client and server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Relay request envelope
///
/// `path` is either an absolute URL or relative to the configured backend base.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ForwardRequest {
    pub path: String,
    /// HTTP method, `GET` when omitted
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// JSON body, only sent for methods other than GET/HEAD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "server", schema(value_type = Object))]
    pub body: Option<JsonValue>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl ForwardRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: default_method(),
            headers: HashMap::new(),
            body: None,
        }
    }
}

/// Token pair as written through the token-pair endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct TokenPairRequest {
    pub access: String,
    pub refresh: String,
}

/// Token pair as currently seen by the server cookie jar
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct TokenPairResponse {
    pub access: Option<String>,
    pub refresh: Option<String>,
    /// Unverified `exp` claim of the access token, when it is a JWT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_expires_at: Option<DateTime<Utc>>,
}

/// Generic acknowledgement body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub const fn ok() -> Self {
        Self { ok: true }
    }
}

/// Result of current-user resolution; never an error
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct SessionStatus {
    pub authenticated: bool,
    #[cfg_attr(feature = "server", schema(value_type = Object))]
    pub user: Option<JsonValue>,
}

impl SessionStatus {
    pub const fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
        }
    }

    pub const fn authenticated(user: JsonValue) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
        }
    }
}
