//! HTTP transport abstraction
//!
//! The dispatcher and renewal coordinator talk to the network through the
//! [`Transport`] trait so tests can script responses. The production
//! implementation wraps reqwest. Non-2xx responses are data, not transport
//! errors: classification is the dispatcher's job, not the transport's.

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::ApiError;
use crate::query::Query;

/// HTTP verbs the API surface exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

/// An outbound call, carried as a value through the dispatch pipeline.
///
/// `retried` is the single-use replay marker: a request enters the pipeline
/// with it unset, and the one permitted renewal-and-replay cycle produces a
/// fresh copy with it set. The flag lives on the request value itself (not
/// in shared state) so concurrent requests can never alias each other's
/// retry budget.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
    pub retried: bool,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
            retried: false,
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query.into_pairs();
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach (or drop) the bearer credential for this transmission.
    pub(crate) fn with_bearer(mut self, bearer: Option<String>) -> Self {
        self.bearer = bearer;
        self
    }

    /// The replay copy: new bearer, retry budget spent.
    pub(crate) fn into_replay(mut self, bearer: String) -> Self {
        self.bearer = Some(bearer);
        self.retried = true;
        self
    }
}

/// A decoded HTTP response, whatever its status.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Sends a pending request and returns the response, or an error for
/// connection-level failures only.
pub trait Transport: Send + Sync {
    fn send(&self, request: PendingRequest) -> BoxFuture<'_, Result<RawResponse, ApiError>>;
}

/// Production transport over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport against `base_url` with the given request timeout.
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: PendingRequest) -> BoxFuture<'_, Result<RawResponse, ApiError>> {
        Box::pin(async move {
            let url = format!("{}{}", self.base_url, request.path);

            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
                Method::Patch => reqwest::Method::PATCH,
                Method::Delete => reqwest::Method::DELETE,
            };

            let mut builder = self.client.request(method, url);

            if !request.query.is_empty() {
                // reqwest encodes a pair list as repeated keys
                builder = builder.query(&request.query);
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }
            if let Some(ref bearer) = request.bearer {
                builder = builder.bearer_auth(bearer);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            // Empty and non-JSON bodies are fine; the payload is optional
            let body = response.json::<Value>().await.ok();

            Ok(RawResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let t = HttpTransport::new(
            "http://192.0.2.10:3000/",
            std::time::Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(t.base_url(), "http://192.0.2.10:3000");
    }

    #[test]
    fn test_replay_copy_spends_retry_budget() {
        let request = PendingRequest::new(Method::Get, "/v1/devices");
        assert!(!request.retried);
        assert!(request.bearer.is_none());

        let replay = request.into_replay("T2".to_string());
        assert!(replay.retried);
        assert_eq!(replay.bearer.as_deref(), Some("T2"));
    }

    #[test]
    fn test_success_status_ranges() {
        assert!(RawResponse { status: 200, body: None }.is_success());
        assert!(RawResponse { status: 204, body: None }.is_success());
        assert!(!RawResponse { status: 301, body: None }.is_success());
        assert!(RawResponse { status: 401, body: None }.is_unauthorized());
    }
}
