//! Error taxonomy for the API client
//!
//! Failures fall into four groups:
//! - Non-2xx responses, normalized to the server's error payload
//! - Transport failures (connection refused, timeout, TLS)
//! - Response bodies that don't match the expected shape
//! - Unrecoverable token-renewal failures, shared by every request that
//!   was waiting on the same renewal

use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors surfaced to API callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status. `message` carries the
    /// server-provided error text when present, a generic fallback otherwise.
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Token renewal failed; the session is over.
    #[error(transparent)]
    Renewal(#[from] RenewalError),
}

/// Why a token-renewal episode ended without a new token.
///
/// Cloneable on purpose: one renewal outcome is delivered to every request
/// that attached to the same in-flight renewal. Both variants end the
/// session identically (credentials cleared, sign-in redirect fired); they
/// are distinct so logs can tell them apart.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenewalError {
    #[error("no refresh token available")]
    MissingRefreshToken,

    #[error("token renewal rejected: {message}")]
    Rejected { message: String },
}

impl ApiError {
    /// Normalize a non-2xx response into a rejected outcome carrying the
    /// server's error payload.
    pub(crate) fn from_status(status: u16, body: Option<Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("request failed with status {status}"));

        ApiError::Status {
            status,
            message,
            body,
        }
    }

    /// HTTP status of the failure, if it got as far as a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
