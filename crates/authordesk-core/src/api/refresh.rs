//! Single-flight token refresh.
//!
//! When several requests hit an expired access token at once, only the first
//! one (the leader) calls the refresh endpoint. Everyone arriving while that
//! call is in flight is parked in a FIFO queue and woken with the leader's
//! outcome: the new access token, or the failure that ended the session.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};

use super::RefreshFailure;
use crate::auth::{Credential, CredentialStore, SessionEvent, TokenKind};

pub type RefreshOutcome = Result<String, RefreshFailure>;

/// How a caller took part in a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Ran the refresh call itself
    Leader,
    /// Waited in the queue for the leader's outcome
    Waiter,
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    queue: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

enum Entry {
    Leader,
    Queued(oneshot::Receiver<RefreshOutcome>),
}

pub struct RefreshCoordinator {
    store: Arc<CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
    // Never held across an await
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<CredentialStore>, events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            store,
            events,
            state: Mutex::new(RefreshState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a refresh call is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.state().refreshing
    }

    /// Number of requests parked behind the in-flight refresh
    pub fn pending(&self) -> usize {
        self.state().queue.len()
    }

    /// Obtain a fresh access token.
    ///
    /// `perform` receives the stored refresh token and must call the refresh
    /// endpoint. It only runs for the leader; queued callers wait for the
    /// leader's result. A missing refresh token fails without calling it.
    ///
    /// On success both tokens are persisted before any waiter is woken. On
    /// failure the store is cleared, every waiter gets the same failure and
    /// [`SessionEvent::Terminated`] is broadcast.
    pub async fn refresh<F, Fut>(&self, perform: F) -> RefreshOutcome
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Credential, RefreshFailure>>,
    {
        self.refresh_with_role(perform).await.1
    }

    /// Like [`refresh`](Self::refresh), also reporting whether this caller
    /// led the refresh or waited for it.
    pub async fn refresh_with_role<F, Fut>(&self, perform: F) -> (Role, RefreshOutcome)
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Credential, RefreshFailure>>,
    {
        let flight = match self.enter() {
            Entry::Queued(waiter) => {
                debug!("Refresh already in flight, queueing request");
                let outcome = waiter.await.unwrap_or(Err(RefreshFailure::Abandoned));
                return (Role::Waiter, outcome);
            }
            Entry::Leader => Flight::new(self),
        };

        let outcome = self.run(perform).await;
        let released = flight.settle(&outcome);

        match &outcome {
            Ok(_) => {
                info!(released, "Access token refreshed");
                let _ = self.events.send(SessionEvent::Refreshed);
            }
            Err(reason) => {
                warn!(released, error = %reason, "Session terminated");
                let _ = self.events.send(SessionEvent::Terminated {
                    reason: reason.clone(),
                });
            }
        }
        (Role::Leader, outcome)
    }

    fn enter(&self) -> Entry {
        let mut state = self.state();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.queue.push_back(tx);
            Entry::Queued(rx)
        } else {
            state.refreshing = true;
            Entry::Leader
        }
    }

    async fn run<F, Fut>(&self, perform: F) -> RefreshOutcome
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Credential, RefreshFailure>>,
    {
        let result = match self.store.get(TokenKind::Refresh).await {
            Some(refresh_token) => perform(refresh_token).await,
            None => {
                warn!("No refresh token stored, cannot refresh session");
                Err(RefreshFailure::MissingRefreshToken)
            }
        };

        match result {
            Ok(credential) => {
                if let Err(e) = self.store.save(&credential).await {
                    warn!(error = %e, "Failed to persist refreshed tokens");
                }
                Ok(credential.access_token)
            }
            Err(failure) => {
                error!(error = %failure, "Token refresh failed, clearing credentials");
                if let Err(e) = self.store.clear().await {
                    warn!(error = %e, "Failed to clear credential store");
                }
                Err(failure)
            }
        }
    }

    /// Return to idle and hand the outcome to every queued request, oldest first
    fn release(&self, outcome: &RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.state();
            state.refreshing = false;
            std::mem::take(&mut state.queue)
        };
        let count = waiters.len();
        for waiter in waiters {
            // A waiter whose caller went away has nothing to resume
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

/// Leader's hold on the refreshing flag. Dropping it unsettled (the leading
/// future was cancelled) releases the queue with `Abandoned`.
struct Flight<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl<'a> Flight<'a> {
    fn new(coordinator: &'a RefreshCoordinator) -> Self {
        Self {
            coordinator,
            settled: false,
        }
    }

    fn settle(mut self, outcome: &RefreshOutcome) -> usize {
        self.settled = true;
        self.coordinator.release(outcome)
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Refresh dropped before it settled, releasing queued requests");
            self.coordinator.release(&Err(RefreshFailure::Abandoned));
        }
    }
}
