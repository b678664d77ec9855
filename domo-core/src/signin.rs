//! Sign-in redirect sink
//!
//! When a session cannot be recovered (renewal rejected, refresh token
//! missing) the client fires this sink exactly once per episode. A browser
//! frontend would navigate to the login page here; a headless client has
//! nothing to navigate, so the shipped implementation logs and raises a
//! flag the host application can poll.

use std::sync::atomic::{AtomicBool, Ordering};

/// Invoked once per unrecoverable-auth episode.
pub trait SigninRedirect: Send + Sync {
    fn redirect_to_signin(&self);
}

/// Default headless sink: warn-level log plus a latched flag.
#[derive(Debug, Default)]
pub struct TracingRedirect {
    requested: AtomicBool,
}

impl TracingRedirect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a sign-in has been requested since construction.
    pub fn signin_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl SigninRedirect for TracingRedirect {
    fn redirect_to_signin(&self) {
        tracing::warn!("session expired, sign-in required");
        self.requested.store(true, Ordering::SeqCst);
    }
}
