//! Portal core types and utilities
//!
//! Shared credential model for the relay and the client fetch wrapper: the
//! access/refresh pair, the backend refresh contract, the client-side
//! credential stores and tracing initialization.

pub mod claims;
pub mod credentials;
pub mod error;
pub mod store;
#[cfg(feature = "tracing")]
pub mod tracing;

pub use credentials::{CredentialPair, RefreshRequest, RefreshResponse, TokenKind};
pub use error::{CoreError, CoreResult};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
