//! Bridges the store's snapshot streams into local lane state.

use crate::board::{
    domain::{Board, Lane, LaneSnapshot, LocalStateError},
    ports::{LaneSubscription, RemoteStore, RemoteStoreError},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors raised while wiring or applying snapshots.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The store refused a lane subscription.
    #[error("failed to subscribe to lane {lane}: {source}")]
    Subscribe {
        /// Lane being subscribed.
        lane: Lane,
        /// Underlying store error.
        source: RemoteStoreError,
    },

    /// Subscriptions need a tokio runtime to run on.
    #[error("no tokio runtime available to run lane subscriptions")]
    RuntimeUnavailable,

    /// Local state could not be accessed.
    #[error(transparent)]
    LocalState(#[from] LocalStateError),
}

/// Applies snapshots to the board's lanes through the pending move ledger.
pub struct Reconciler<S, C>
where
    S: RemoteStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    board: Arc<Board>,
    store: Arc<S>,
    clock: Arc<C>,
    settle_timeout: Duration,
}

impl<S, C> Clone for Reconciler<S, C>
where
    S: RemoteStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            board: Arc::clone(&self.board),
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            settle_timeout: self.settle_timeout,
        }
    }
}

impl<S, C> Reconciler<S, C>
where
    S: RemoteStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a reconciler for `board`.
    #[must_use]
    pub const fn new(
        board: Arc<Board>,
        store: Arc<S>,
        clock: Arc<C>,
        settle_timeout: Duration,
    ) -> Self {
        Self {
            board,
            store,
            clock,
            settle_timeout,
        }
    }

    /// Applies one snapshot to its lane.
    ///
    /// Returns whether the lane contents changed. Applying the same snapshot
    /// twice in a row changes nothing the second time.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::LocalState`] when the ledger is unavailable.
    pub fn apply(&self, snapshot: LaneSnapshot) -> Result<bool, ReconcileError> {
        apply_snapshot(&self.board, &*self.clock, self.settle_timeout, snapshot)
    }

    /// Subscribes to every lane and applies snapshots as they arrive.
    ///
    /// The lanes show the store's contents at subscription time when this
    /// returns. Later snapshots are applied by one task per lane, in
    /// delivery order. Dropping or shutting down the returned handle ends
    /// the subscriptions.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::RuntimeUnavailable`] outside a tokio runtime,
    /// [`ReconcileError::Subscribe`] when the store refuses a lane and
    /// [`ReconcileError::LocalState`] when the ledger is unavailable.
    pub fn start(&self) -> Result<ReconcilerHandle, ReconcileError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ReconcileError::RuntimeUnavailable)?;

        let mut subscriptions = Vec::with_capacity(Lane::ALL.len());
        for lane in Lane::ALL {
            let subscription = self
                .store
                .subscribe(lane)
                .map_err(|source| ReconcileError::Subscribe { lane, source })?;
            subscriptions.push(subscription);
        }
        for subscription in &mut subscriptions {
            if let Some(initial) = subscription.take_initial() {
                self.apply(initial)?;
            }
        }

        let tasks = subscriptions
            .into_iter()
            .map(|subscription| {
                runtime.spawn(drive_lane(
                    Arc::clone(&self.board),
                    Arc::clone(&self.clock),
                    self.settle_timeout,
                    subscription,
                ))
            })
            .collect();
        tracing::debug!("lane subscriptions started");
        Ok(ReconcilerHandle { tasks })
    }
}

fn apply_snapshot(
    board: &Board,
    clock: &impl Clock,
    settle_timeout: Duration,
    snapshot: LaneSnapshot,
) -> Result<bool, ReconcileError> {
    let lane = snapshot.lane();
    let received = snapshot.tasks().len();
    let (changed, expired) = board.apply_snapshot(snapshot, clock.utc(), settle_timeout)?;
    for pending in expired {
        tracing::warn!(
            task_id = %pending.task().id(),
            source = %pending.source(),
            destination = %pending.destination(),
            "pending move expired before snapshots confirmed it"
        );
    }
    tracing::debug!(%lane, received, changed, "applied lane snapshot");
    Ok(changed)
}

async fn drive_lane<C: Clock>(
    board: Arc<Board>,
    clock: Arc<C>,
    settle_timeout: Duration,
    mut subscription: LaneSubscription,
) {
    let lane = subscription.lane();
    while let Some(snapshot) = subscription.next().await {
        if let Err(err) = apply_snapshot(&board, &*clock, settle_timeout, snapshot) {
            tracing::warn!(%lane, error = %err, "dropping lane subscription");
            return;
        }
    }
    tracing::debug!(%lane, "lane subscription closed by store");
}

/// Running lane subscriptions.
///
/// Dropping the handle aborts them. Transactions already issued are
/// unaffected.
#[derive(Debug)]
pub struct ReconcilerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl ReconcilerHandle {
    /// Returns `true` while any lane subscription is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Ends all lane subscriptions.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
