//! Bearer-token handling for calls to the recruitment backend.
//!
//! How tokens are first obtained (login, registration) is outside this crate; the store is
//! seeded by the caller and kept current by [`RefreshCoordinator`].

mod refresh;

pub use refresh::RefreshCoordinator;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

/// Access/refresh token pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Shared holder of the current credentials.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    current: Arc<RwLock<Option<Credentials>>>,
}

impl CredentialStore {
    pub fn new(initial: Option<Credentials>) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn current(&self) -> Option<Credentials> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|credentials| credentials.access_token.clone())
    }

    pub fn replace(&self, credentials: Credentials) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }

    /// Drop the session, as a logout would.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Exchanges a stale token pair for a fresh one.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, stale: &Credentials) -> Result<Credentials, RefreshError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token available")]
    MissingCredentials,
    #[error("token refresh rejected: {0}")]
    Rejected(String),
    #[error("token refresh transport failure: {0}")]
    Transport(String),
    #[error("token refresh was abandoned before completing")]
    Abandoned,
}
