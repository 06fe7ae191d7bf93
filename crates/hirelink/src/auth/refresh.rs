use std::mem;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::{CredentialStore, Credentials, RefreshError, TokenRefresher};

type RefreshOutcome = Result<Credentials, RefreshError>;

enum RefreshState {
    Idle,
    Refreshing(Vec<oneshot::Sender<RefreshOutcome>>),
}

/// Runs at most one token refresh at a time; concurrent callers share its outcome.
pub struct RefreshCoordinator<R> {
    refresher: Arc<R>,
    store: CredentialStore,
    state: Mutex<RefreshState>,
}

impl<R> RefreshCoordinator<R>
where
    R: TokenRefresher + 'static,
{
    pub fn new(refresher: Arc<R>, store: CredentialStore) -> Self {
        Self {
            refresher,
            store,
            state: Mutex::new(RefreshState::Idle),
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Refresh after `stale_access` was rejected.
    ///
    /// Returns the stored credentials directly when another caller already replaced that token.
    pub async fn refresh_from(&self, stale_access: &str) -> RefreshOutcome {
        self.run(Some(stale_access)).await
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        self.run(None).await
    }

    async fn run(&self, stale_access: Option<&str>) -> RefreshOutcome {
        let waiter = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match &mut *state {
                RefreshState::Refreshing(waiters) => {
                    let (sender, receiver) = oneshot::channel();
                    waiters.push(sender);
                    Some(receiver)
                }
                RefreshState::Idle => {
                    // The store is updated before the state returns to Idle.
                    if let (Some(stale), Some(current)) = (stale_access, self.store.current()) {
                        if current.access_token != stale {
                            return Ok(current);
                        }
                    }
                    *state = RefreshState::Refreshing(Vec::new());
                    None
                }
            }
        };

        if let Some(receiver) = waiter {
            debug!("joining in-flight token refresh");
            return receiver.await.unwrap_or(Err(RefreshError::Abandoned));
        }

        let flight = InFlight {
            state: &self.state,
            settled: false,
        };
        let outcome = match self.store.current() {
            Some(stale) if stale.refresh_token.is_some() => self.refresher.refresh(&stale).await,
            _ => Err(RefreshError::MissingCredentials),
        };

        match &outcome {
            Ok(fresh) => {
                info!("access token refreshed");
                self.store.replace(fresh.clone());
            }
            Err(error) => {
                warn!(%error, "token refresh failed, clearing credentials");
                self.store.clear();
            }
        }
        flight.settle(&outcome);
        outcome
    }
}

/// Leader's hold on the `Refreshing` state.
///
/// Dropping it unsettled (the leading future was cancelled) resets to `Idle`; queued waiters
/// then observe a closed channel and report `Abandoned`.
struct InFlight<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        let waiters = self.reset();
        self.settled = true;
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn reset(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing(waiters) => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            drop(self.reset());
        }
    }
}
