//! Credential storage for the API client
//!
//! The store owns the access/refresh token pair exclusively. The dispatcher
//! only ever reads tokens or triggers a whole-pair replacement; it never
//! holds a copy beyond a single request. Replacement is atomic: both tokens
//! change together or not at all.

use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Access/refresh token pair, as issued by the sign-in and renewal endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Owner of the credential pair.
///
/// `set_credentials` must complete before any request depending on the new
/// pair resumes; both implementations below are synchronous, which satisfies
/// that trivially.
pub trait CredentialStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    /// Replace the whole pair at once.
    fn set_credentials(&self, pair: TokenPair);
    fn clear(&self);
}

/// In-memory store for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    pair: RwLock<Option<TokenPair>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            pair: RwLock::new(Some(pair)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.pair
            .read()
            .expect("credential lock poisoned")
            .as_ref()
            .map(|p| p.access_token.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        self.pair
            .read()
            .expect("credential lock poisoned")
            .as_ref()
            .map(|p| p.refresh_token.clone())
    }

    fn set_credentials(&self, pair: TokenPair) {
        *self.pair.write().expect("credential lock poisoned") = Some(pair);
    }

    fn clear(&self) {
        *self.pair.write().expect("credential lock poisoned") = None;
    }
}

/// File-backed store at a caller-chosen path (the default lives under the
/// platform config dir, see [`crate::config::ClientConfig`]).
///
/// The pair is rewritten as a whole on every change, and the file is chmod
/// 0600 on unix.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn read_pair(&self) -> Option<TokenPair> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&data).ok()
    }

    fn write_pair(&self, pair: &TokenPair) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(pair).expect("token pair serializes");
        std::fs::write(&self.path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.read_pair().map(|p| p.access_token)
    }

    fn refresh_token(&self) -> Option<String> {
        self.read_pair().map(|p| p.refresh_token)
    }

    fn set_credentials(&self, pair: TokenPair) {
        if let Err(e) = self.write_pair(&pair) {
            tracing::warn!("failed to persist credentials: {e}");
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to clear credentials: {e}"),
        }
    }
}
