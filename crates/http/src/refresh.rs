//! Refresh coordinator for relayed calls
//!
//! Per forwarded call:
//!
//! ```text
//! Initial --401 + refresh cookie--> Refreshing --2xx--> Retrying --> Done
//!    |                                  |
//!    |--401, no refresh cookie--> Failed <--non-2xx (cookies cleared)
//!    '--anything else--> Done
//! ```
//!
//! At most one refresh and one retry happen per call. A retry that is itself
//! rejected is returned as-is. Concurrent calls refreshing against the same
//! cookie jar are not coordinated; the last pair the backend issues wins.

use crate::config::RelayConfig;
use crate::cookies::CookieStore;
use crate::error::{HttpError, Result};
use crate::forwarding::{OutboundRequest, Upstream, UpstreamResponse, forward};
use http::{HeaderValue, Method, StatusCode, header};
use portal_core::{CredentialPair, RefreshRequest, RefreshResponse, TokenKind};
use std::fmt;

/// Coordinator state for one forwarded call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Initial,
    Refreshing,
    Retrying,
    Done,
    Failed,
}

impl fmt::Display for RelayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayPhase::Initial => "initial",
            RelayPhase::Refreshing => "refreshing",
            RelayPhase::Retrying => "retrying",
            RelayPhase::Done => "done",
            RelayPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a refresh exchange against the server credential store
#[derive(Debug)]
pub enum RefreshOutcome {
    /// New pair persisted into the cookie store
    Rotated(CredentialPair),
    /// No refresh cookie; nothing was sent
    NoRefreshToken,
    /// Backend refused the exchange; both cookies were cleared
    Rejected(StatusCode),
}

pub struct RefreshCoordinator<'a> {
    upstream: &'a dyn Upstream,
    config: &'a RelayConfig,
}

impl<'a> RefreshCoordinator<'a> {
    pub fn new(upstream: &'a dyn Upstream, config: &'a RelayConfig) -> Self {
        Self { upstream, config }
    }

    /// Issue `call` with the stored credentials, refreshing and replaying once on 401.
    ///
    /// Transport failures on any leg propagate as [`HttpError::Upstream`].
    #[tracing::instrument(
        name = "relay.call",
        skip_all,
        fields(method = %call.method, url = %call.url, phase = tracing::field::Empty)
    )]
    pub async fn relay(
        &self,
        cookies: &mut CookieStore,
        call: OutboundRequest,
    ) -> Result<UpstreamResponse> {
        let span = tracing::Span::current();
        let finish = |phase: RelayPhase| {
            span.record("phase", tracing::field::display(phase));
        };

        let initial = self.attempt(cookies, call.clone()).await?;
        if !initial.is_unauthorized() {
            finish(RelayPhase::Done);
            return Ok(initial);
        }

        debug!(
            "Upstream returned 401; phase {} -> {}",
            RelayPhase::Initial,
            RelayPhase::Refreshing
        );

        match self.refresh(cookies).await? {
            RefreshOutcome::Rotated(_) => {
                debug!("Credentials rotated; phase {}", RelayPhase::Retrying);
                let retried = self.attempt(cookies, call).await?;
                if retried.is_unauthorized() {
                    warn!("Retried call still unauthorized; not refreshing again");
                }
                finish(RelayPhase::Done);
                Ok(retried)
            }
            RefreshOutcome::NoRefreshToken | RefreshOutcome::Rejected(_) => {
                finish(RelayPhase::Failed);
                Ok(initial)
            }
        }
    }

    /// Exchange the refresh cookie for a new pair and persist it.
    ///
    /// A returned access token always replaces the stored one; the refresh
    /// cookie is rewritten only when the backend rotated it. Tokens that
    /// cannot be stored as cookies count as a rejected refresh.
    #[tracing::instrument(name = "relay.refresh", skip_all, fields(outcome = tracing::field::Empty))]
    pub async fn refresh(&self, cookies: &mut CookieStore) -> Result<RefreshOutcome> {
        let span = tracing::Span::current();

        let Some(refresh_token) = cookies.get(TokenKind::Refresh.name()).map(String::from) else {
            span.record("outcome", "no_refresh_token");
            info!("No refresh token stored; skipping refresh");
            return Ok(RefreshOutcome::NoRefreshToken);
        };

        let body = serde_json::to_vec(&RefreshRequest {
            refresh: refresh_token,
        })
        .map_err(|e| HttpError::InternalServerError(format!("Failed to encode refresh: {e}")))?;

        let mut request = OutboundRequest::new(Method::POST, self.config.refresh_url())
            .with_cookie(cookies.cookie_header());
        request.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        request.body = Some(body.into());

        let response = forward(self.upstream, request).await?;
        let previous = cookies.credentials();
        let rotated = response
            .is_success()
            .then(|| response.json::<RefreshResponse>())
            .flatten()
            .filter(RefreshResponse::is_usable)
            .filter(|tokens| {
                let issued = CredentialPair {
                    access: Some(tokens.access.clone()),
                    refresh: tokens.refresh.clone(),
                };
                match cookies.store_credentials(&issued, &self.config.cookies) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Refresh issued a token that cannot be stored: {}", e);
                        false
                    }
                }
            });

        match rotated {
            Some(tokens) => {
                span.record("outcome", "rotated");
                info!("Session credentials refreshed");
                Ok(RefreshOutcome::Rotated(previous.rotated(tokens)))
            }
            None => {
                cookies.clear_credentials(&self.config.cookies);
                span.record("outcome", "rejected");
                warn!(
                    "Refresh rejected with status {}; credentials cleared",
                    response.status
                );
                Ok(RefreshOutcome::Rejected(response.status))
            }
        }
    }

    async fn attempt(
        &self,
        cookies: &CookieStore,
        call: OutboundRequest,
    ) -> Result<UpstreamResponse> {
        let mut request = call.with_cookie(cookies.cookie_header());
        if let Some(access) = cookies.get(TokenKind::Access.name()) {
            request = request.with_bearer(Some(access));
        }
        forward(self.upstream, request).await
    }
}
