//! Task board facade exposed to the UI.

use super::{
    DropEvent, EditCoordinator, EditOutcome, EditResult, InFlightMove, MoveCoordinator,
    MoveHandle, MoveRequest, MoveResult, ReconcileError, Reconciler, ReconcilerHandle,
    TaskDialogResult,
};
use crate::board::{
    domain::{Board, Lane, LaneSet, LaneState, LocalStateError, Task, TaskFields, TaskId},
    ports::RemoteStore,
};
use crate::config::BoardConfig;
use mockable::Clock;
use std::sync::Arc;

/// A kanban board kept in sync with a remote store.
///
/// The three lanes are observable handles that stay the same objects for
/// the board's lifetime. Drag-and-drop moves show up in them immediately;
/// edits show up once the store pushes the changed lane.
pub struct TaskBoard<S, C>
where
    S: RemoteStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    board: Arc<Board>,
    config: BoardConfig,
    reconciler: Reconciler<S, C>,
    mover: MoveCoordinator<S, C>,
    editor: EditCoordinator<S>,
}

impl<S, C> TaskBoard<S, C>
where
    S: RemoteStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a board over `store`. Call [`Self::start`] to begin syncing.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>, config: BoardConfig) -> Self {
        let board = Arc::new(Board::new());
        let reconciler = Reconciler::new(
            Arc::clone(&board),
            Arc::clone(&store),
            Arc::clone(&clock),
            config.settle_timeout(),
        );
        let mover = MoveCoordinator::new(
            Arc::clone(&board),
            Arc::clone(&store),
            clock,
            config.rollback_on_failure(),
        );
        let editor = EditCoordinator::new(store);
        Self {
            board,
            config,
            reconciler,
            mover,
            editor,
        }
    }

    /// Returns the board configuration.
    #[must_use]
    pub const fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Returns all three lanes.
    #[must_use]
    pub fn lanes(&self) -> &LaneSet {
        self.board.lanes()
    }

    /// Returns one lane.
    #[must_use]
    pub fn lane(&self, lane: Lane) -> &LaneState {
        self.board.lane(lane)
    }

    /// Returns the snapshot reconciler.
    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler<S, C> {
        &self.reconciler
    }

    /// Subscribes to the store's lanes.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when subscriptions cannot be started.
    pub fn start(&self) -> Result<ReconcilerHandle, ReconcileError> {
        self.reconciler.start()
    }

    /// Splices a move locally and hands back the transaction to commit.
    ///
    /// Dropping the returned move without committing it reverts the splice.
    ///
    /// # Errors
    ///
    /// See [`MoveCoordinator::begin`].
    pub fn begin_move(&self, request: &MoveRequest) -> MoveResult<Option<InFlightMove<S>>> {
        self.mover.begin(request)
    }

    /// Moves a task and persists the move in the background.
    ///
    /// # Errors
    ///
    /// See [`MoveCoordinator::move_task`].
    pub fn move_task(&self, request: &MoveRequest) -> MoveResult<Option<MoveHandle>> {
        self.mover.move_task(request)
    }

    /// Handles a drop gesture.
    ///
    /// # Errors
    ///
    /// See [`MoveCoordinator::drop_task`].
    pub fn drop_task(&self, event: DropEvent) -> MoveResult<Option<MoveHandle>> {
        self.mover.drop_task(event)
    }

    /// Routes an editor dialog result for a task in `lane`.
    ///
    /// # Errors
    ///
    /// See [`EditCoordinator::apply_dialog`].
    pub async fn edit(
        &self,
        lane: Lane,
        task: &Task,
        result: Option<TaskDialogResult>,
    ) -> EditResult<EditOutcome> {
        self.editor.apply_dialog(lane, task, result).await
    }

    /// Writes a task's fields to its record.
    ///
    /// # Errors
    ///
    /// See [`EditCoordinator::save`].
    pub async fn save(&self, lane: Lane, task: &Task) -> EditResult<()> {
        self.editor.save(lane, task).await
    }

    /// Deletes a task's record.
    ///
    /// # Errors
    ///
    /// See [`EditCoordinator::delete`].
    pub async fn delete(&self, lane: Lane, task: &Task) -> EditResult<()> {
        self.editor.delete(lane, task).await
    }

    /// Adds a task to the `todo` lane.
    ///
    /// # Errors
    ///
    /// See [`EditCoordinator::new_task`].
    pub async fn new_task(&self, fields: &TaskFields) -> EditResult<TaskId> {
        self.editor.new_task(fields).await
    }

    /// Returns the number of moves not yet confirmed by snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStateError`] when the ledger is unavailable.
    pub fn pending_moves(&self) -> Result<usize, LocalStateError> {
        self.board.pending_moves()
    }

    /// Returns `true` when every move has been confirmed by snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStateError`] when the ledger is unavailable.
    pub fn is_settled(&self) -> Result<bool, LocalStateError> {
        Ok(self.pending_moves()? == 0)
    }
}
