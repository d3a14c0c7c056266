//! Application services for board synchronisation.

mod board;
mod edit;
mod moves;
mod reconciler;

pub use board::TaskBoard;
pub use edit::{EditCoordinator, EditError, EditOutcome, EditResult, TaskDialogResult};
pub use moves::{
    DropEvent, InFlightMove, MoveCoordinator, MoveError, MoveHandle, MoveRequest, MoveResult,
};
pub use reconciler::{ReconcileError, Reconciler, ReconcilerHandle};
