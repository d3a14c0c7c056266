//! Remote document store port: one collection per lane.

use crate::board::domain::{Lane, LaneSnapshot, TaskFields, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};

/// Result type for remote store operations.
pub type RemoteStoreResult<T> = Result<T, RemoteStoreError>;

/// One write inside an atomic transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Add a new document to a lane; the store assigns its id.
    Insert {
        /// Target lane.
        lane: Lane,
        /// Document content.
        fields: TaskFields,
    },
    /// Remove a document from a lane.
    Delete {
        /// Lane holding the document.
        lane: Lane,
        /// Document identifier.
        id: TaskId,
    },
}

/// Per-operation result of a committed transaction, in operation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A document was inserted and received this id.
    Inserted {
        /// Lane the document was added to.
        lane: Lane,
        /// Store-assigned identifier.
        id: TaskId,
    },
    /// A document was deleted.
    Deleted {
        /// Lane the document was removed from.
        lane: Lane,
        /// Removed identifier.
        id: TaskId,
    },
}

/// Remote collection-of-records contract.
///
/// The store is the source of truth. Writes complete once durable; their
/// effect reaches the board only through subsequent snapshots.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Subscribes to a lane's snapshot stream.
    ///
    /// The subscription yields the lane's current contents first, then a
    /// full snapshot after every change.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError`] when the subscription cannot be opened.
    fn subscribe(&self, lane: Lane) -> RemoteStoreResult<LaneSubscription>;

    /// Inserts a document and returns its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError`] when the write is rejected or fails.
    async fn insert(&self, lane: Lane, fields: &TaskFields) -> RemoteStoreResult<TaskId>;

    /// Deletes a document by id.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError::NotFound`] when the lane holds no such
    /// document.
    async fn delete(&self, lane: Lane, id: &TaskId) -> RemoteStoreResult<()>;

    /// Replaces a document's fields by id.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError::NotFound`] when the lane holds no such
    /// document.
    async fn update(&self, lane: Lane, id: &TaskId, fields: &TaskFields) -> RemoteStoreResult<()>;

    /// Applies all operations atomically, across lanes.
    ///
    /// Either every operation takes effect or none does.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError`] when any operation is rejected or the
    /// commit fails.
    async fn transact(&self, ops: Vec<WriteOp>) -> RemoteStoreResult<Vec<WriteOutcome>>;
}

/// Cancellable stream of snapshots for one lane.
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct LaneSubscription {
    lane: Lane,
    initial: Option<LaneSnapshot>,
    receiver: broadcast::Receiver<LaneSnapshot>,
}

impl LaneSubscription {
    /// Creates a subscription that yields `initial` before live snapshots.
    #[must_use]
    pub const fn new(
        lane: Lane,
        initial: Option<LaneSnapshot>,
        receiver: broadcast::Receiver<LaneSnapshot>,
    ) -> Self {
        Self {
            lane,
            initial,
            receiver,
        }
    }

    /// Returns the subscribed lane.
    #[must_use]
    pub const fn lane(&self) -> Lane {
        self.lane
    }

    /// Takes the snapshot of the lane's contents at subscription time, if
    /// it has not been yielded yet.
    pub fn take_initial(&mut self) -> Option<LaneSnapshot> {
        self.initial.take()
    }

    /// Waits for the next snapshot.
    ///
    /// A receiver that fell behind skips to the newest snapshots; each one
    /// is complete so nothing is lost. Returns `None` when the store closes
    /// the stream.
    pub async fn next(&mut self) -> Option<LaneSnapshot> {
        if let Some(snapshot) = self.initial.take() {
            return Some(snapshot);
        }
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(lane = %self.lane, skipped, "snapshot subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Errors returned by remote store implementations.
#[derive(Debug, Clone, Error)]
pub enum RemoteStoreError {
    /// The lane holds no document with the id.
    #[error("task {task_id} not found in lane {lane}")]
    NotFound {
        /// Lane that was searched.
        lane: Lane,
        /// Missing identifier.
        task_id: TaskId,
    },

    /// The store refused the request.
    #[error("request rejected by store: {0}")]
    Rejected(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Storage-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RemoteStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
