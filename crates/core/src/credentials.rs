//! Credential pair model shared by the server and client credential stores
//!
//! Both stores hold the same two logical fields. They are never synchronized
//! with each other; each is derived from whatever pair the backend last issued
//! to its side of the session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two tokens making up a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Storage key / cookie name for this token
    pub const fn name(self) -> &'static str {
        match self {
            TokenKind::Access => "accessToken",
            TokenKind::Refresh => "refreshToken",
        }
    }

    pub const ALL: [TokenKind; 2] = [TokenKind::Access, TokenKind::Refresh];
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Access/refresh pair as held by one credential store
///
/// Presence of `access` says nothing about validity; the backend is
/// authoritative and rejects stale tokens with a 401.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh: Some(refresh.into()),
        }
    }

    /// Returns the token of the given kind, if stored
    pub fn get(&self, kind: TokenKind) -> Option<&str> {
        match kind {
            TokenKind::Access => self.access.as_deref(),
            TokenKind::Refresh => self.refresh.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }

    /// Applies a successful refresh exchange.
    ///
    /// The access token is always replaced. The refresh token is replaced only
    /// when the backend rotated it; otherwise the previous one is retained.
    #[must_use]
    pub fn rotated(&self, response: RefreshResponse) -> Self {
        Self {
            access: Some(response.access),
            refresh: response.refresh.or_else(|| self.refresh.clone()),
        }
    }

    /// `Authorization` header value for the stored access token
    pub fn bearer(&self) -> Option<String> {
        self.access.as_ref().map(|token| format!("Bearer {token}"))
    }
}

// Tokens are secrets; keep them out of debug output and logs.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &self.access.as_ref().map(|_| "<redacted>"))
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Body of the backend's `POST /auth/token/refresh/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Successful refresh exchange; `refresh` is present only when rotated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl RefreshResponse {
    /// A refresh response without a usable access token counts as a failed refresh
    pub fn is_usable(&self) -> bool {
        !self.access.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_retains_previous_refresh_token() {
        let pair = CredentialPair::new("old-access", "old-refresh");
        let rotated = pair.rotated(RefreshResponse {
            access: "new-access".to_string(),
            refresh: None,
        });

        assert_eq!(rotated.access.as_deref(), Some("new-access"));
        assert_eq!(rotated.refresh.as_deref(), Some("old-refresh"));
    }

    #[test]
    fn test_rotation_replaces_both_tokens() {
        let pair = CredentialPair::new("old-access", "old-refresh");
        let rotated = pair.rotated(RefreshResponse {
            access: "new-access".to_string(),
            refresh: Some("new-refresh".to_string()),
        });

        assert_eq!(rotated, CredentialPair::new("new-access", "new-refresh"));
    }

    #[test]
    fn test_refresh_response_without_rotation_parses() {
        let response: RefreshResponse = serde_json::from_str(r#"{"access":"abc"}"#).unwrap();
        assert_eq!(response.access, "abc");
        assert!(response.refresh.is_none());
        assert!(response.is_usable());

        let empty: RefreshResponse = serde_json::from_str(r#"{"access":""}"#).unwrap();
        assert!(!empty.is_usable());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let pair = CredentialPair::new("secret-access", "secret-refresh");
        let debug = format!("{pair:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_token_names() {
        assert_eq!(TokenKind::Access.name(), "accessToken");
        assert_eq!(TokenKind::Refresh.to_string(), "refreshToken");
        assert_eq!(
            CredentialPair::new("a", "r").bearer().as_deref(),
            Some("Bearer a")
        );
        assert!(CredentialPair::default().bearer().is_none());
        assert!(CredentialPair::default().is_empty());
    }
}
