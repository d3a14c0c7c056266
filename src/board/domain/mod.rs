//! Domain model for the task board.
//!
//! Tasks, lanes and the in-memory lane state live here together with the
//! pending move ledger that explains which incoming snapshots are stale.
//! Nothing in this module talks to the remote store.

mod board;
mod error;
mod ids;
mod lane;
mod lane_state;
mod pending;
mod task;

pub use board::{Board, SplicedMove};
pub use error::{BoardDomainError, LocalStateError};
pub use ids::{MoveTicket, TaskId};
pub use lane::Lane;
pub use lane_state::{LaneObserver, LaneSet, LaneState};
pub use pending::{PendingLedger, PendingMove};
pub use task::{LaneSnapshot, Task, TaskFields};
