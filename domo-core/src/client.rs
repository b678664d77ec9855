//! Resilient API client
//!
//! Every call runs the same pipeline: authorize (attach the current bearer
//! token), send, classify. Classification has three disjoint cases, checked
//! in order:
//!
//! 1. A failure on the renewal route itself ends the session: renewal state
//!    reset, credentials cleared, sign-in redirect fired, error propagated.
//! 2. A 401 on a not-yet-retried, non-sign-in request renews the token
//!    (attaching to an in-flight renewal when one exists) and replays the
//!    request exactly once with the new bearer.
//! 3. Everything else: 2xx passes through unchanged, any other status is
//!    normalized to the server's error payload.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::error::{ApiError, Result};
use crate::query::Query;
use crate::refresh::RefreshCoordinator;
use crate::routes;
use crate::signin::{SigninRedirect, TracingRedirect};
use crate::transport::{HttpTransport, Method, PendingRequest, RawResponse, Transport};

/// Shared API entry point for the rest of the application.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    redirect: Arc<dyn SigninRedirect>,
    coordinator: RefreshCoordinator,
}

impl ApiClient {
    /// Build a client from injected collaborators. Each client owns its own
    /// renewal coordinator.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        redirect: Arc<dyn SigninRedirect>,
    ) -> Self {
        Self {
            transport,
            store,
            redirect,
            coordinator: RefreshCoordinator::new(),
        }
    }

    /// Production wiring: reqwest transport, file-backed credentials,
    /// headless redirect sink.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.base_url, config.request_timeout())?;
        let store = FileCredentialStore::new(config.credentials_file());

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(store),
            Arc::new(TracingRedirect::new()),
        ))
    }

    /// The credential store this client reads from.
    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.store)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: Query) -> Result<T> {
        let request = PendingRequest::new(Method::Get, path).with_query(query);
        decode(self.execute(request).await?)
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Option<Value>) -> Result<T> {
        let mut request = PendingRequest::new(Method::Post, path);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        decode(self.execute(request).await?)
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str, body: Option<Value>) -> Result<T> {
        let mut request = PendingRequest::new(Method::Patch, path);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        decode(self.execute(request).await?)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = PendingRequest::new(Method::Delete, path);
        decode(self.execute(request).await?)
    }

    /// The dispatch pipeline.
    async fn execute(&self, request: PendingRequest) -> Result<Option<Value>> {
        // Outbound stage: attach the current access token. With no token the
        // request goes out unauthenticated; rejecting it is the server's job.
        let authorized = request.clone().with_bearer(self.store.access_token());
        let outcome = self.transport.send(authorized).await;

        // Case 1: the failing request was itself the renewal call.
        if request.path == routes::auth::REFRESH {
            return match outcome {
                Ok(response) if response.is_success() => Ok(response.body),
                failed => {
                    tracing::warn!("renewal route failed outside the coordinator, ending session");
                    self.coordinator.reset();
                    self.store.clear();
                    self.redirect.redirect_to_signin();
                    Err(into_error(failed))
                }
            };
        }

        let response = outcome?;
        if response.is_success() {
            return Ok(response.body);
        }

        // Case 2: recoverable auth failure. The sign-in call is never
        // intercepted, and a replayed request never re-enters this arm.
        if response.is_unauthorized() && !request.retried && request.path != routes::auth::LOGIN {
            let renewal = self.coordinator.renew(
                Arc::clone(&self.transport),
                Arc::clone(&self.store),
                Arc::clone(&self.redirect),
            );
            let token = renewal.await?;

            let replay = request.into_replay(token);
            let replayed = self.transport.send(replay).await?;
            if replayed.is_success() {
                return Ok(replayed.body);
            }
            // A second 401 surfaces like any other failure
            return Err(ApiError::from_status(replayed.status, replayed.body));
        }

        // Case 3: ordinary failure, normalized.
        Err(ApiError::from_status(response.status, response.body))
    }
}

fn decode<T: DeserializeOwned>(body: Option<Value>) -> Result<T> {
    Ok(serde_json::from_value(body.unwrap_or(Value::Null))?)
}

fn into_error(outcome: std::result::Result<RawResponse, ApiError>) -> ApiError {
    match outcome {
        Ok(response) => ApiError::from_status(response.status, response.body),
        Err(err) => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{MemoryCredentialStore, TokenPair};
    use crate::error::RenewalError;
    use futures::future::BoxFuture;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted transport. Any request with bearer equal to the renewed
    /// token succeeds; anything else is a 401. The renewal endpoint parks
    /// until `gate` 401s have been served, so tests can force concurrent
    /// requests to all observe an expired token before the renewal lands.
    struct MockTransport {
        refresh_ok: bool,
        renewed_token: &'static str,
        gate: usize,
        refresh_calls: AtomicUsize,
        unauthorized_served: AtomicUsize,
        sent: Mutex<Vec<PendingRequest>>,
    }

    impl MockTransport {
        fn new(refresh_ok: bool, gate: usize) -> Arc<Self> {
            Arc::new(Self {
                refresh_ok,
                renewed_token: "T2",
                gate,
                refresh_calls: AtomicUsize::new(0),
                unauthorized_served: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn with_renewed_token(refresh_ok: bool, gate: usize, token: &'static str) -> Arc<Self> {
            Arc::new(Self {
                refresh_ok,
                renewed_token: token,
                gate,
                refresh_calls: AtomicUsize::new(0),
                unauthorized_served: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn refresh_calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }

        fn sent(&self) -> Vec<PendingRequest> {
            self.sent.lock().unwrap().clone()
        }

        fn sends_to(&self, path: &str) -> usize {
            self.sent().iter().filter(|r| r.path == path).count()
        }
    }

    impl Transport for MockTransport {
        fn send(&self, request: PendingRequest) -> BoxFuture<'_, Result<RawResponse>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(request.clone());

                if request.path == routes::auth::REFRESH {
                    self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                    while self.unauthorized_served.load(Ordering::SeqCst) < self.gate {
                        tokio::task::yield_now().await;
                    }
                    if self.refresh_ok {
                        return Ok(RawResponse {
                            status: 200,
                            body: Some(json!({
                                "accessToken": self.renewed_token,
                                "refreshToken": "R2",
                            })),
                        });
                    }
                    return Ok(RawResponse {
                        status: 401,
                        body: Some(json!({ "message": "refresh token expired" })),
                    });
                }

                match request.path.as_str() {
                    "/v1/teapot" => Ok(RawResponse {
                        status: 418,
                        body: Some(json!({ "message": "i am a teapot" })),
                    }),
                    "/v1/broken" => Ok(RawResponse {
                        status: 500,
                        body: None,
                    }),
                    _ if request.bearer.as_deref() == Some("T2") => Ok(RawResponse {
                        status: 200,
                        body: Some(json!({ "ok": true, "path": request.path })),
                    }),
                    _ => {
                        self.unauthorized_served.fetch_add(1, Ordering::SeqCst);
                        Ok(RawResponse {
                            status: 401,
                            body: Some(json!({ "message": "token expired" })),
                        })
                    }
                }
            })
        }
    }

    struct CountingRedirect {
        calls: AtomicUsize,
    }

    impl CountingRedirect {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SigninRedirect for CountingRedirect {
        fn redirect_to_signin(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stale_pair() -> TokenPair {
        TokenPair {
            access_token: "T1".to_string(),
            refresh_token: "R1".to_string(),
        }
    }

    fn client_with(
        transport: Arc<MockTransport>,
        store: Arc<MemoryCredentialStore>,
    ) -> (ApiClient, Arc<CountingRedirect>) {
        let redirect = CountingRedirect::new();
        let client = ApiClient::new(transport, store, Arc::clone(&redirect) as Arc<dyn SigninRedirect>);
        (client, redirect)
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_renewal() {
        let transport = MockTransport::new(true, 3);
        let store = Arc::new(MemoryCredentialStore::with_pair(stale_pair()));
        let (client, redirect) = client_with(Arc::clone(&transport), Arc::clone(&store));

        let (a, b, c) = tokio::join!(
            client.get::<Value>("/v1/devices", Query::new()),
            client.get::<Value>("/v1/users", Query::new()),
            client.get::<Value>("/v1/overview", Query::new()),
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(transport.refresh_calls(), 1);
        assert_eq!(redirect.calls(), 0);

        // Store ends holding the renewed pair
        assert_eq!(store.access_token().as_deref(), Some("T2"));
        assert_eq!(store.refresh_token().as_deref(), Some("R2"));

        // Each request was sent twice: once with the stale token, once
        // replayed with Bearer T2
        for path in ["/v1/devices", "/v1/users", "/v1/overview"] {
            assert_eq!(transport.sends_to(path), 2, "path {path}");
            let replays: Vec<_> = transport
                .sent()
                .into_iter()
                .filter(|r| r.path == path && r.retried)
                .collect();
            assert_eq!(replays.len(), 1, "path {path}");
            assert_eq!(replays[0].bearer.as_deref(), Some("T2"));
        }
    }

    #[tokio::test]
    async fn test_renewal_settles_after_coordinator_is_idle() {
        let transport = MockTransport::new(true, 1);
        let store = Arc::new(MemoryCredentialStore::with_pair(stale_pair()));
        let (client, _redirect) = client_with(Arc::clone(&transport), store);

        client
            .get::<Value>("/v1/devices", Query::new())
            .await
            .unwrap();

        // The episode is over; no stale in-progress state survives
        assert!(!client.coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_replayed_request_is_not_retried_twice() {
        // Renewal "succeeds" but hands back a token the server still rejects
        let transport = MockTransport::with_renewed_token(true, 1, "T-stale");
        let store = Arc::new(MemoryCredentialStore::with_pair(stale_pair()));
        let (client, _redirect) = client_with(Arc::clone(&transport), store);

        let err = client
            .get::<Value>("/v1/devices", Query::new())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(transport.refresh_calls(), 1);
        // Initial send plus exactly one replay, never a third attempt
        assert_eq!(transport.sends_to("/v1/devices"), 2);
    }

    #[tokio::test]
    async fn test_rejected_renewal_clears_store_and_redirects_once() {
        let transport = MockTransport::new(false, 2);
        let store = Arc::new(MemoryCredentialStore::with_pair(stale_pair()));
        let (client, redirect) = client_with(Arc::clone(&transport), Arc::clone(&store));

        let (a, b) = tokio::join!(
            client.get::<Value>("/v1/devices", Query::new()),
            client.get::<Value>("/v1/users", Query::new()),
        );

        for outcome in [a, b] {
            match outcome.unwrap_err() {
                ApiError::Renewal(RenewalError::Rejected { message }) => {
                    assert_eq!(message, "refresh token expired");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(transport.refresh_calls(), 1);
        assert_eq!(redirect.calls(), 1);
        assert!(store.access_token().is_none());
        assert!(!client.coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_never_calls_renewal() {
        let transport = MockTransport::new(true, 0);
        let store = Arc::new(MemoryCredentialStore::new());
        let (client, redirect) = client_with(Arc::clone(&transport), Arc::clone(&store));

        let err = client
            .get::<Value>("/v1/devices", Query::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Renewal(RenewalError::MissingRefreshToken)
        ));
        assert_eq!(transport.refresh_calls(), 0);
        assert_eq!(redirect.calls(), 1);
        assert!(store.access_token().is_none());
    }

    #[tokio::test]
    async fn test_success_passes_through_untouched() {
        let transport = MockTransport::new(true, 0);
        let store = Arc::new(MemoryCredentialStore::with_pair(TokenPair {
            access_token: "T2".to_string(),
            refresh_token: "R2".to_string(),
        }));
        let (client, redirect) = client_with(Arc::clone(&transport), store);

        let body: Value = client.get("/v1/devices", Query::new()).await.unwrap();

        assert_eq!(body, json!({ "ok": true, "path": "/v1/devices" }));
        assert_eq!(transport.sends_to("/v1/devices"), 1);
        assert_eq!(transport.refresh_calls(), 0);
        assert_eq!(redirect.calls(), 0);
    }

    #[tokio::test]
    async fn test_ordinary_failures_are_normalized() {
        let transport = MockTransport::new(true, 0);
        let store = Arc::new(MemoryCredentialStore::with_pair(TokenPair {
            access_token: "T2".to_string(),
            refresh_token: "R2".to_string(),
        }));
        let (client, _redirect) = client_with(Arc::clone(&transport), store);

        let err = client
            .get::<Value>("/v1/teapot", Query::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(418));
        assert_eq!(err.to_string(), "i am a teapot");

        // No server payload: generic fallback message
        let err = client
            .get::<Value>("/v1/broken", Query::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "request failed with status 500");

        assert_eq!(transport.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_renewal_route_failure_is_terminal() {
        let transport = MockTransport::new(false, 0);
        let store = Arc::new(MemoryCredentialStore::with_pair(stale_pair()));
        let (client, redirect) = client_with(Arc::clone(&transport), Arc::clone(&store));

        // A caller posting the renewal route directly gets no retry
        let err = client
            .post::<Value>(
                routes::auth::REFRESH,
                Some(json!({ "refreshToken": "R1" })),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(redirect.calls(), 1);
        assert!(store.access_token().is_none());
        assert!(!client.coordinator.is_refreshing());
        // Exactly the one failing call, no renewal launched on top of it
        assert_eq!(transport.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_signin_call_is_never_intercepted() {
        let transport = MockTransport::new(true, 0);
        let store = Arc::new(MemoryCredentialStore::new());
        let (client, redirect) = client_with(Arc::clone(&transport), store);

        // Bad credentials: the login 401 surfaces as an ordinary failure
        let err = client
            .post::<Value>(
                routes::auth::LOGIN,
                Some(json!({ "username": "ada", "password": "wrong" })),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(transport.refresh_calls(), 0);
        assert_eq!(redirect.calls(), 0);
    }

    #[tokio::test]
    async fn test_requests_without_token_go_out_unauthenticated() {
        let transport = MockTransport::new(true, 0);
        let store = Arc::new(MemoryCredentialStore::new());
        let (client, _redirect) = client_with(Arc::clone(&transport), store);

        let _ = client
            .post::<Value>(routes::auth::LOGIN, Some(json!({})))
            .await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].bearer.is_none());
    }
}
