//! Relay executor: the raw HTTP forward to the backend
//!
//! Headers are sent exactly as supplied. Credential attachment happens one
//! layer up, in the refresh coordinator.

use crate::error::{HttpError, Result};
use crate::types::ForwardRequest;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use std::time::Duration;

/// A single outbound call
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl OutboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Build the logical call described by a relay envelope
    pub fn from_envelope(envelope: &ForwardRequest, url: String) -> Result<Self> {
        let method = Method::from_bytes(envelope.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| HttpError::BadRequest(format!("invalid method: {}", envelope.method)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &envelope.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HttpError::BadRequest(format!("invalid header name: {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| HttpError::BadRequest(format!("invalid value for header {name}")))?;
            headers.insert(name, value);
        }

        let body = envelope
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| HttpError::BadRequest(format!("invalid body: {e}")))?
            .map(Bytes::from);

        let mut request = Self {
            method,
            url,
            headers,
            body,
        };
        if request.body.is_some() && !request.headers.contains_key(header::CONTENT_TYPE) {
            request.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        Ok(request)
    }

    /// Whether this method may carry a body
    pub fn allows_body(&self) -> bool {
        self.method != Method::GET && self.method != Method::HEAD
    }

    /// Set or replace the bearer credential
    pub fn with_bearer(mut self, token: Option<&str>) -> Self {
        self.headers.remove(header::AUTHORIZATION);
        if let Some(token) = token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    self.headers.insert(header::AUTHORIZATION, value);
                }
                Err(_) => warn!("Access token is not a valid header value; sending without it"),
            }
        }
        self
    }

    /// Forward the caller's cookie header verbatim
    pub fn with_cookie(mut self, cookie: Option<&str>) -> Self {
        if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(c).ok()) {
            self.headers.insert(header::COOKIE, value);
        }
        self
    }
}

/// Raw upstream response
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Status, `content-type` and body; every other upstream header is dropped
    #[cfg(feature = "server")]
    pub fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(axum::body::Body::from(self.body));
        *response.status_mut() = self.status;
        if let Some(content_type) = self.content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}

/// Transport to the backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse>;
}

/// `reqwest`-backed transport
///
/// Redirects are never followed: a 3xx goes back to the caller as-is, since
/// only the first URL passed the allow-list.
#[derive(Clone, Debug)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                HttpError::InternalServerError(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for ReqwestUpstream {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Issue a call, attaching the body only for methods other than GET/HEAD
#[tracing::instrument(
    name = "relay.forward",
    skip_all,
    fields(method = %request.method, url = %request.url, status = tracing::field::Empty)
)]
pub async fn forward(upstream: &dyn Upstream, mut request: OutboundRequest) -> Result<UpstreamResponse> {
    if !request.allows_body() {
        request.body = None;
    }

    match upstream.send(request).await {
        Ok(response) => {
            tracing::Span::current().record("status", response.status.as_u16());
            Ok(response)
        }
        Err(e) => {
            error!("Upstream request failed: {}", e);
            Err(e)
        }
    }
}
