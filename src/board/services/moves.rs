//! Drag-and-drop moves between lanes.
//!
//! A move is spliced into local lane state synchronously and persisted as a
//! single transaction (`delete` from the source collection, `insert` into the
//! destination) afterwards. The transaction assigns the task a new id.

use crate::board::{
    domain::{Board, Lane, LocalStateError, MoveTicket, SplicedMove, Task, TaskId},
    ports::{RemoteStore, RemoteStoreError, WriteOp, WriteOutcome},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// A drop gesture as reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropEvent {
    /// Lane the drag started in.
    pub previous_lane: Lane,
    /// Lane the task was dropped into.
    pub lane: Lane,
    /// Index of the dragged task in the previous lane.
    pub previous_index: usize,
    /// Index the task was dropped at.
    pub current_index: usize,
}

impl DropEvent {
    /// Creates a drop event.
    #[must_use]
    pub const fn new(
        previous_lane: Lane,
        lane: Lane,
        previous_index: usize,
        current_index: usize,
    ) -> Self {
        Self {
            previous_lane,
            lane,
            previous_index,
            current_index,
        }
    }
}

/// Request to move one task between lanes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    source: Lane,
    destination: Lane,
    task_id: TaskId,
    destination_index: usize,
}

impl MoveRequest {
    /// Creates a move request for the task with `task_id`.
    #[must_use]
    pub const fn new(
        source: Lane,
        destination: Lane,
        task_id: TaskId,
        destination_index: usize,
    ) -> Self {
        Self {
            source,
            destination,
            task_id,
            destination_index,
        }
    }

    /// Creates a move request for `task`.
    #[must_use]
    pub fn for_task(
        source: Lane,
        destination: Lane,
        task: &Task,
        destination_index: usize,
    ) -> Self {
        Self::new(source, destination, task.id().clone(), destination_index)
    }

    /// Returns the source lane.
    #[must_use]
    pub const fn source(&self) -> Lane {
        self.source
    }

    /// Returns the destination lane.
    #[must_use]
    pub const fn destination(&self) -> Lane {
        self.destination
    }

    /// Returns the moved task's id.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Returns the requested destination index.
    #[must_use]
    pub const fn destination_index(&self) -> usize {
        self.destination_index
    }
}

/// Errors raised by move operations.
#[derive(Debug, Error)]
pub enum MoveError {
    /// The task is not shown in the source lane.
    #[error("task {task_id} is not in lane {lane}")]
    TaskNotInLane {
        /// Source lane.
        lane: Lane,
        /// Requested task.
        task_id: TaskId,
    },

    /// The drop event points past the end of the source lane.
    #[error("lane {lane} has no task at index {index}")]
    NoTaskAtIndex {
        /// Source lane.
        lane: Lane,
        /// Requested index.
        index: usize,
    },

    /// The task is still the unconfirmed copy of an earlier move.
    #[error("task {task_id} is still being moved")]
    MovePending {
        /// Requested task.
        task_id: TaskId,
    },

    /// Background transactions need a tokio runtime.
    #[error("no tokio runtime available to persist the move")]
    RuntimeUnavailable,

    /// Local state could not be accessed.
    #[error(transparent)]
    LocalState(#[from] LocalStateError),

    /// The store rejected or failed the move transaction.
    #[error("move of task {task_id} failed (rolled back: {rolled_back}): {source}")]
    TransactionFailed {
        /// Task that was being moved.
        task_id: TaskId,
        /// Whether the local splice was reverted.
        rolled_back: bool,
        /// Underlying store error.
        source: RemoteStoreError,
    },

    /// The transaction committed without reporting the inserted document.
    #[error("move of task {task_id} committed without an insert outcome")]
    MissingInsertOutcome {
        /// Task that was moved.
        task_id: TaskId,
    },
}

/// Result type for move operations.
pub type MoveResult<T> = Result<T, MoveError>;

/// Background transaction of a move, resolving to the task's new id.
pub type MoveHandle = JoinHandle<MoveResult<TaskId>>;

/// A move spliced locally whose transaction has not been issued yet.
///
/// Dropping it without calling [`InFlightMove::commit`] abandons the move
/// and restores the task to its source lane.
#[must_use = "a spliced move is reverted unless committed"]
pub struct InFlightMove<S: RemoteStore> {
    board: Arc<Board>,
    store: Arc<S>,
    rollback_on_failure: bool,
    source: Lane,
    destination: Lane,
    spliced: SplicedMove,
    armed: bool,
}

impl<S: RemoteStore> std::fmt::Debug for InFlightMove<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightMove")
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("spliced", &self.spliced)
            .finish_non_exhaustive()
    }
}

impl<S: RemoteStore> InFlightMove<S> {
    /// Returns the ledger ticket of this move.
    pub const fn ticket(&self) -> MoveTicket {
        self.spliced.ticket
    }

    /// Returns the moved task as it was before the move.
    pub const fn task(&self) -> &Task {
        &self.spliced.task
    }

    /// Returns the index the task was placed at in the destination lane.
    pub const fn destination_index(&self) -> usize {
        self.spliced.destination_index
    }

    /// Persists the move and returns the task's new id.
    ///
    /// On failure the pending move is abandoned and, when configured, the
    /// local splice reverted.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::TransactionFailed`] when the store rejects the
    /// transaction and [`MoveError::MissingInsertOutcome`] when it commits
    /// without reporting the new document.
    pub async fn commit(mut self) -> MoveResult<TaskId> {
        self.armed = false;
        let task = &self.spliced.task;
        let ops = vec![
            WriteOp::Delete {
                lane: self.source,
                id: task.id().clone(),
            },
            WriteOp::Insert {
                lane: self.destination,
                fields: task.fields().clone(),
            },
        ];

        match self.store.transact(ops).await {
            Ok(outcomes) => {
                let inserted = outcomes.into_iter().find_map(|outcome| match outcome {
                    WriteOutcome::Inserted { lane, id } if lane == self.destination => Some(id),
                    _ => None,
                });
                let Some(new_id) = inserted else {
                    tracing::warn!(
                        task_id = %task.id(),
                        "move committed without an insert outcome"
                    );
                    return Err(MoveError::MissingInsertOutcome {
                        task_id: task.id().clone(),
                    });
                };
                if let Err(err) = self.board.confirm(self.spliced.ticket, new_id.clone()) {
                    tracing::warn!(
                        task_id = %task.id(),
                        new_id = %new_id,
                        error = %err,
                        "move committed but its replacement id was not recorded"
                    );
                }
                tracing::debug!(
                    old_id = %task.id(),
                    new_id = %new_id,
                    destination = %self.destination,
                    "move committed"
                );
                Ok(new_id)
            }
            Err(source) => {
                let abandoned = self
                    .board
                    .abandon(self.spliced.ticket, self.rollback_on_failure)?;
                let rolled_back = self.rollback_on_failure && abandoned.is_some();
                tracing::warn!(
                    task_id = %task.id(),
                    source_lane = %self.source,
                    destination = %self.destination,
                    rolled_back,
                    error = %source,
                    "move transaction failed"
                );
                Err(MoveError::TransactionFailed {
                    task_id: task.id().clone(),
                    rolled_back,
                    source,
                })
            }
        }
    }
}

impl<S: RemoteStore> Drop for InFlightMove<S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let task_id = self.spliced.task.id();
        match self.board.abandon(self.spliced.ticket, true) {
            Ok(_) => tracing::debug!(%task_id, "uncommitted move reverted"),
            Err(err) => tracing::warn!(
                %task_id,
                error = %err,
                "uncommitted move could not be reverted"
            ),
        }
    }
}

/// Moves tasks between lanes.
pub struct MoveCoordinator<S, C>
where
    S: RemoteStore + 'static,
    C: Clock + Send + Sync,
{
    board: Arc<Board>,
    store: Arc<S>,
    clock: Arc<C>,
    rollback_on_failure: bool,
}

impl<S, C> Clone for MoveCoordinator<S, C>
where
    S: RemoteStore + 'static,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            board: Arc::clone(&self.board),
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            rollback_on_failure: self.rollback_on_failure,
        }
    }
}

impl<S, C> MoveCoordinator<S, C>
where
    S: RemoteStore + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a move coordinator.
    #[must_use]
    pub const fn new(
        board: Arc<Board>,
        store: Arc<S>,
        clock: Arc<C>,
        rollback_on_failure: bool,
    ) -> Self {
        Self {
            board,
            store,
            clock,
            rollback_on_failure,
        }
    }

    /// Splices a move into local state without touching the store.
    ///
    /// Returns `Ok(None)` for a same-lane request, which is not persisted.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::TaskNotInLane`] when the task is not shown in the
    /// source lane and [`MoveError::MovePending`] when it is the unconfirmed
    /// copy of an earlier move.
    pub fn begin(&self, request: &MoveRequest) -> MoveResult<Option<InFlightMove<S>>> {
        if request.source == request.destination {
            return Ok(None);
        }
        if self.board.is_unconfirmed_copy(&request.task_id)? {
            return Err(MoveError::MovePending {
                task_id: request.task_id.clone(),
            });
        }
        let spliced = self
            .board
            .splice(
                request.source,
                request.destination,
                &request.task_id,
                request.destination_index,
                self.clock.utc(),
            )?
            .ok_or_else(|| MoveError::TaskNotInLane {
                lane: request.source,
                task_id: request.task_id.clone(),
            })?;
        tracing::debug!(
            task_id = %request.task_id,
            source = %request.source,
            destination = %request.destination,
            index = spliced.destination_index,
            "move spliced locally"
        );
        Ok(Some(InFlightMove {
            board: Arc::clone(&self.board),
            store: Arc::clone(&self.store),
            rollback_on_failure: self.rollback_on_failure,
            source: request.source,
            destination: request.destination,
            spliced,
            armed: true,
        }))
    }

    /// Moves a task and persists the move in the background.
    ///
    /// The lanes reflect the move when this returns. The returned handle
    /// resolves to the task's new id once the transaction completes; it may
    /// be dropped without cancelling the transaction.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::begin`], and
    /// [`MoveError::RuntimeUnavailable`] outside a tokio runtime.
    pub fn move_task(&self, request: &MoveRequest) -> MoveResult<Option<MoveHandle>> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| MoveError::RuntimeUnavailable)?;
        Ok(self
            .begin(request)?
            .map(|in_flight| runtime.spawn(in_flight.commit())))
    }

    /// Resolves a drop event into a move request.
    ///
    /// Returns `Ok(None)` when the task was dropped back into its own lane.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::NoTaskAtIndex`] when the previous index is empty.
    pub fn resolve_drop(&self, event: DropEvent) -> MoveResult<Option<MoveRequest>> {
        if event.previous_lane == event.lane {
            return Ok(None);
        }
        let task = self
            .board
            .lane(event.previous_lane)
            .get(event.previous_index)
            .ok_or(MoveError::NoTaskAtIndex {
                lane: event.previous_lane,
                index: event.previous_index,
            })?;
        Ok(Some(MoveRequest::for_task(
            event.previous_lane,
            event.lane,
            &task,
            event.current_index,
        )))
    }

    /// Handles a drop gesture: resolves it and moves the task.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::resolve_drop`] and [`Self::move_task`].
    pub fn drop_task(&self, event: DropEvent) -> MoveResult<Option<MoveHandle>> {
        match self.resolve_drop(event)? {
            Some(request) => self.move_task(&request),
            None => Ok(None),
        }
    }
}
