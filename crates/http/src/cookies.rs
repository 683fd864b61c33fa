//! Server credential store backed by the client's cookie jar
//!
//! A [`CookieStore`] lives for a single request/response cycle. Reads come from
//! the incoming `Cookie` header, writes become `Set-Cookie` directives on the
//! response. Writes are visible to later reads in the same cycle so a retried
//! upstream call sees the rotated token. Values outside the cookie-octet
//! grammar are refused rather than written.

use crate::config::CookieConfig;
use crate::error::HttpError;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
    response::{IntoResponseParts, ResponseParts},
};
use portal_core::{CredentialPair, TokenKind};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => f.write_str("Strict"),
            SameSite::Lax => f.write_str("Lax"),
            SameSite::None => f.write_str("None"),
        }
    }
}

/// Attributes for a `Set-Cookie` directive
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age: Option<u64>,
    pub secure: bool,
}

impl CookieOptions {
    /// Options for a credential cookie: http-only, lax, configured lifetime
    pub fn credential(config: &CookieConfig, kind: TokenKind) -> Self {
        Self {
            http_only: true,
            same_site: SameSite::Lax,
            path: config.path.clone(),
            max_age: Some(config.max_age(kind)),
            secure: config.secure,
        }
    }

    /// Options that expire a credential cookie immediately
    pub fn expired(config: &CookieConfig) -> Self {
        Self {
            max_age: Some(0),
            ..Self::credential(config, TokenKind::Access)
        }
    }
}

/// A value that cannot be stored in a cookie without changing its meaning
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("value for cookie {name} contains characters not allowed in a cookie")]
pub struct InvalidCookieValue {
    pub name: String,
}

impl From<InvalidCookieValue> for HttpError {
    fn from(err: InvalidCookieValue) -> Self {
        HttpError::BadRequest(err.to_string())
    }
}

/// `cookie-octet` from RFC 6265: visible ASCII except `"`, `,`, `;` and `\`
pub fn is_cookie_value(value: &str) -> bool {
    value
        .bytes()
        .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}

/// Render a `Set-Cookie` header value
pub fn build_set_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut cookie = format!("{name}={value}; Path={}", options.path);
    if let Some(max_age) = options.max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    cookie.push_str(&format!("; SameSite={}", options.same_site));
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Per-request cookie store
#[derive(Debug, Clone, Default)]
pub struct CookieStore {
    incoming: Option<String>,
    values: BTreeMap<String, String>,
    pending: Vec<String>,
}

impl CookieStore {
    /// Parse every `Cookie` header of the incoming request
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let raw: Vec<&str> = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();

        let mut values = BTreeMap::new();
        for pair in raw.iter().flat_map(|h| h.split(';')) {
            if let Some((name, value)) = pair.trim().split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    values.insert(name.to_string(), value.trim().to_string());
                }
            }
        }

        Self {
            incoming: (!raw.is_empty()).then(|| raw.join("; ")),
            values,
            pending: Vec::new(),
        }
    }

    /// Value of a cookie; absent means "no credential", never a fault
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn set(
        &mut self,
        name: &str,
        value: &str,
        options: &CookieOptions,
    ) -> Result<(), InvalidCookieValue> {
        if !is_cookie_value(value) {
            return Err(InvalidCookieValue {
                name: name.to_string(),
            });
        }
        self.values.insert(name.to_string(), value.to_string());
        self.pending.push(build_set_cookie(name, value, options));
        Ok(())
    }

    pub fn delete(&mut self, name: &str, config: &CookieConfig) {
        self.values.remove(name);
        self.pending
            .push(build_set_cookie(name, "", &CookieOptions::expired(config)));
    }

    /// The request's original `Cookie` header, forwarded verbatim upstream
    pub fn cookie_header(&self) -> Option<&str> {
        self.incoming.as_deref()
    }

    pub fn credentials(&self) -> CredentialPair {
        CredentialPair {
            access: self.get(TokenKind::Access.name()).map(String::from),
            refresh: self.get(TokenKind::Refresh.name()).map(String::from),
        }
    }

    /// Persist a pair. A missing half leaves the stored cookie untouched.
    ///
    /// Both halves are checked before either is written, so a rejected pair
    /// leaves the store as it was.
    pub fn store_credentials(
        &mut self,
        pair: &CredentialPair,
        config: &CookieConfig,
    ) -> Result<(), InvalidCookieValue> {
        for kind in TokenKind::ALL {
            if pair.get(kind).is_some_and(|value| !is_cookie_value(value)) {
                return Err(InvalidCookieValue {
                    name: kind.name().to_string(),
                });
            }
        }
        for kind in TokenKind::ALL {
            if let Some(value) = pair.get(kind) {
                self.set(kind.name(), value, &CookieOptions::credential(config, kind))?;
            }
        }
        Ok(())
    }

    pub fn clear_credentials(&mut self, config: &CookieConfig) {
        for kind in TokenKind::ALL {
            self.delete(kind.name(), config);
        }
    }

    /// `Set-Cookie` directives accumulated during this cycle
    pub fn set_cookie_headers(&self) -> &[String] {
        &self.pending
    }

    /// Append pending directives to a response header map
    pub fn apply(&self, headers: &mut HeaderMap) {
        for directive in &self.pending {
            match HeaderValue::from_str(directive) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(e) => warn!("Dropping unrepresentable Set-Cookie directive: {}", e),
            }
        }
    }
}

impl<S> FromRequestParts<S> for CookieStore
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

impl IntoResponseParts for CookieStore {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.apply(res.headers_mut());
        Ok(res)
    }
}
