//! Portal HTTP: authenticated request relay and client fetch wrapper
//!
//! The `server` feature provides the relay side: a per-request cookie
//! credential store, the allow-list gate, the relay executor, the refresh
//! coordinator and the axum routes exposing them. The `client` feature
//! provides [`client::ApiClient`], the same single-retry refresh cycle driven
//! from a client-held credential store.

#[macro_use]
extern crate tracing;

pub mod error;
pub mod types;

#[cfg(feature = "server")]
pub mod allowlist;
#[cfg(feature = "server")]
#[path = "config/mod.rs"]
pub mod config;
#[cfg(feature = "server")]
pub mod cookies;
#[cfg(feature = "server")]
pub mod forwarding;
#[cfg(feature = "server")]
pub mod refresh;
#[cfg(feature = "server")]
pub mod routes;
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub mod state;

#[cfg(feature = "client")]
pub mod client;

pub use error::{HttpError, Result};

#[cfg(feature = "server")]
pub use config::{CookieConfig, RelayConfig};
#[cfg(feature = "server")]
pub use server::HttpServer;
#[cfg(feature = "server")]
pub use state::AppState;
