//! Application state management

use crate::allowlist::AllowList;
use crate::config::RelayConfig;
use crate::error::Result;
use crate::forwarding::{ReqwestUpstream, Upstream};
use crate::refresh::RefreshCoordinator;
use std::sync::Arc;

/// Shared application state
///
/// Holds only immutable configuration and the outbound transport. Credentials
/// are never kept here; each request carries its own cookie store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub allow_list: Arc<AllowList>,
    pub upstream: Arc<dyn Upstream>,
}

impl AppState {
    /// Create state with a `reqwest` transport honoring the configured timeout
    pub fn new(config: RelayConfig) -> Result<Self> {
        let upstream = ReqwestUpstream::new(config.timeout())?;
        Ok(Self::with_upstream(config, Arc::new(upstream)))
    }

    /// Create state with a custom transport
    pub fn with_upstream(config: RelayConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            allow_list: Arc::new(AllowList::from_config(&config)),
            config: Arc::new(config),
            upstream,
        }
    }

    pub fn coordinator(&self) -> RefreshCoordinator<'_> {
        RefreshCoordinator::new(self.upstream.as_ref(), &self.config)
    }
}
