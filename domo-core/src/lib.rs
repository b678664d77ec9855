//! domo-core: Shared API layer for domo clients
//!
//! This crate provides:
//! - A resilient request dispatcher with bearer-credential attachment
//! - Single-flight token renewal shared by all concurrent requests
//! - Credential storage (in-memory and file-backed)
//! - Client configuration

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod query;
pub mod refresh;
pub mod routes;
pub mod signin;
pub mod transport;

pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenPair};
pub use error::{ApiError, RenewalError, Result};
pub use query::Query;
pub use refresh::RefreshCoordinator;
pub use signin::{SigninRedirect, TracingRedirect};
pub use transport::{HttpTransport, Method, PendingRequest, RawResponse, Transport};
