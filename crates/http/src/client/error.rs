//! Client error types

use portal_core::CoreError;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error; never retried
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Unrecoverable 401: no refresh token, refresh rejected, or retry rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Call cancelled by the caller; never replayed
    #[error("Request aborted")]
    Aborted,

    /// Absolute URL outside the configured backend; credentials are never sent there
    #[error("Refusing to send credentials to foreign origin: {0}")]
    ForeignOrigin(String),

    /// The background refresh task panicked or was cancelled by the runtime
    #[error("Refresh task failed: {0}")]
    RefreshTask(String),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential store failure
    #[error("Credential store error: {0}")]
    Store(#[from] CoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Caller should send the user back through login
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
