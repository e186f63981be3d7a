//! Tracking of running effects
//!
//! The same counter type backs two things: the [`EffectHandle`] returned for
//! one action, and the store-wide count that shutdown waits on.

use crate::error::StoreError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Counts running effects and wakes waiters when the count drops to zero
#[derive(Clone)]
pub(crate) struct InFlight {
    running: Arc<AtomicUsize>,
    idle: Arc<watch::Sender<()>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        let (idle, _) = watch::channel(());
        Self {
            running: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(idle),
        }
    }

    /// Register one running effect; it stays counted until the guard drops
    pub(crate) fn enter(&self) -> InFlightGuard {
        self.running.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }

    pub(crate) fn count(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Resolve once no effect is registered
    pub(crate) async fn idle(&self) {
        // Subscribe first so a drop to zero between the check and the await is not missed.
        let mut rx = self.idle.subscribe();
        while self.count() > 0 {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Keeps an effect counted; dropping it (also while unwinding) releases the slot
pub(crate) struct InFlightGuard(InFlight);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.running.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.send_replace(());
        }
    }
}

/// Handle for the effects started by one [`Store::send`](crate::Store::send)
///
/// Only the effects returned for that action are tracked. Actions they feed
/// back into the store start their own, untracked, effects.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(MovieAction::ResetMovies).await?;
/// handle.wait_with_timeout(Duration::from_secs(1)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: InFlight,
}

impl EffectHandle {
    pub(crate) fn tracking(effects: &InFlight) -> Self {
        Self {
            effects: effects.clone(),
        }
    }

    /// A handle with nothing to wait for
    #[must_use]
    pub fn completed() -> Self {
        Self {
            effects: InFlight::new(),
        }
    }

    /// Number of tracked effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.count()
    }

    /// Wait until every tracked effect has finished
    pub async fn wait(&mut self) {
        self.effects.idle().await;
    }

    /// Like [`wait`](Self::wait), bounded by `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running at the deadline.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending", &self.pending())
            .finish()
    }
}
