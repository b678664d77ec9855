//! Token renewal coordination
//!
//! At most one renewal call is in flight at any time, process-wide per
//! client. The first 401 installs a shared future and launches the renewal;
//! every 401 classified while that future is present attaches to it instead
//! of starting its own call. The slot is cleared before the future settles
//! its observers, so no stale "in progress" state can survive an episode.

use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::json;

use crate::credentials::{CredentialStore, TokenPair};
use crate::error::RenewalError;
use crate::routes;
use crate::signin::SigninRedirect;
use crate::transport::{Method, PendingRequest, Transport};

/// Outcome every waiter of one renewal episode receives: the new access
/// token, or the shared rejection.
pub type RenewalFuture = Shared<BoxFuture<'static, Result<String, RenewalError>>>;

/// The `IDLE -> REFRESHING -> IDLE` state machine. One instance per client;
/// tests may construct isolated coordinators.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Arc<CoordinatorState>,
}

#[derive(Default)]
struct CoordinatorState {
    in_flight: Mutex<Option<RenewalFuture>>,
}

impl CoordinatorState {
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<RenewalFuture>> {
        self.in_flight.lock().expect("renewal state lock poisoned")
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a renewal episode is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.state.slot().is_some()
    }

    /// Force the coordinator back to idle, dropping any recorded renewal.
    ///
    /// Used when a failure on the renewal route itself is observed outside
    /// the renewal body.
    pub fn reset(&self) {
        *self.state.slot() = None;
    }

    /// Return the in-flight renewal, launching one if the coordinator is
    /// idle. All callers await the same future; exactly one renewal request
    /// reaches the wire per episode.
    pub(crate) fn renew(
        &self,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        redirect: Arc<dyn SigninRedirect>,
    ) -> RenewalFuture {
        let mut slot = self.state.slot();

        if let Some(pending) = slot.as_ref() {
            tracing::debug!("attaching to in-flight token renewal");
            return pending.clone();
        }

        let state = Arc::clone(&self.state);
        let renewal = async move {
            let result = run_renewal(transport, store, redirect).await;
            // Back to idle before any waiter observes the outcome
            *state.slot() = None;
            result
        }
        .boxed()
        .shared();

        *slot = Some(renewal.clone());
        renewal
    }
}

/// One renewal episode: read the refresh token, call the renewal endpoint,
/// replace the stored pair. Any failure ends the session: credentials are
/// cleared and the sign-in redirect fires, exactly once, from here.
async fn run_renewal(
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    redirect: Arc<dyn SigninRedirect>,
) -> Result<String, RenewalError> {
    let Some(refresh_token) = store.refresh_token() else {
        tracing::warn!("no refresh token available, ending session");
        store.clear();
        redirect.redirect_to_signin();
        return Err(RenewalError::MissingRefreshToken);
    };

    let request = PendingRequest::new(Method::Post, routes::auth::REFRESH)
        .with_body(json!({ "refreshToken": refresh_token }));

    let rejection = match transport.send(request).await {
        Ok(response) if response.is_success() => {
            match response
                .body
                .map(serde_json::from_value::<TokenPair>)
                .transpose()
            {
                Ok(Some(pair)) => {
                    store.set_credentials(pair.clone());
                    tracing::debug!("access token renewed");
                    return Ok(pair.access_token);
                }
                _ => RenewalError::Rejected {
                    message: "malformed token renewal response".to_string(),
                },
            }
        }
        Ok(response) => {
            let message = response
                .body
                .as_ref()
                .and_then(|b| b.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("renewal endpoint returned {}", response.status));
            RenewalError::Rejected { message }
        }
        Err(err) => RenewalError::Rejected {
            message: err.to_string(),
        },
    };

    tracing::warn!("token renewal failed ({rejection}), ending session");
    store.clear();
    redirect.redirect_to_signin();
    Err(rejection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_is_idempotent_from_idle() {
        let coordinator = RefreshCoordinator::new();
        assert!(!coordinator.is_refreshing());

        coordinator.reset();
        assert!(!coordinator.is_refreshing());
    }
}
