//! Local board state: the three lanes plus the pending move ledger.
//!
//! Every lane mutation goes through [`Board`] while holding the ledger lock,
//! so a snapshot being applied can never interleave with a splice or a
//! rollback. The lock also guards the last snapshot received per lane, which
//! is re-applied when an expired move leaves a lane the incoming snapshot
//! does not cover.

use super::{
    Lane, LaneSet, LaneSnapshot, LaneState, LocalStateError, MoveTicket, PendingLedger, PendingMove,
    Task, TaskId,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Result of a local splice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplicedMove {
    /// Ledger ticket for the move.
    pub ticket: MoveTicket,
    /// The task as it was removed from the source lane.
    pub task: Task,
    /// Index the task occupied in the source lane.
    pub source_index: usize,
    /// Index the task was placed at in the destination lane.
    pub destination_index: usize,
}

#[derive(Debug, Default)]
struct SyncState {
    ledger: PendingLedger,
    remote: BTreeMap<Lane, LaneSnapshot>,
}

/// Shared local state of one board.
#[derive(Debug, Default)]
pub struct Board {
    lanes: LaneSet,
    state: Mutex<SyncState>,
}

impl Board {
    /// Creates a board with three empty lanes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lanes.
    #[must_use]
    pub const fn lanes(&self) -> &LaneSet {
        &self.lanes
    }

    /// Returns the state of one lane.
    #[must_use]
    pub const fn lane(&self, lane: Lane) -> &LaneState {
        self.lanes.get(lane)
    }

    fn state(&self) -> Result<MutexGuard<'_, SyncState>, LocalStateError> {
        self.state
            .lock()
            .map_err(|err| LocalStateError::LedgerPoisoned(err.to_string()))
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        std::thread::scope(|scope| {
            let outcome = scope
                .spawn(|| {
                    let _guard = self.state.lock();
                    panic!("board state poisoned for a test");
                })
                .join();
            assert!(outcome.is_err(), "poisoning thread must panic");
        });
    }

    /// Returns the number of moves awaiting confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStateError`] when the ledger lock is poisoned.
    pub fn pending_moves(&self) -> Result<usize, LocalStateError> {
        Ok(self.state()?.ledger.len())
    }

    /// Returns a copy of the pending move for `ticket`, if still pending.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStateError`] when the ledger lock is poisoned.
    pub fn pending_move(&self, ticket: MoveTicket) -> Result<Option<PendingMove>, LocalStateError> {
        Ok(self.state()?.ledger.get(ticket).cloned())
    }

    /// Applies a store snapshot to its lane, filtered through the ledger.
    ///
    /// Moves older than `settle_timeout` are dropped first and returned so
    /// the caller can report them. Other lanes touched by an expired move are
    /// recomputed from their last snapshot. The returned flag tells whether
    /// the snapshot's lane changed.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStateError`] when the ledger lock is poisoned.
    pub fn apply_snapshot(
        &self,
        snapshot: LaneSnapshot,
        now: DateTime<Utc>,
        settle_timeout: Duration,
    ) -> Result<(bool, Vec<PendingMove>), LocalStateError> {
        let mut state = self.state()?;
        let expired = state.ledger.expire(now, settle_timeout);
        let lane = snapshot.lane();
        state.remote.insert(lane, snapshot.clone());
        let tasks = state.ledger.reconcile(snapshot);
        let changed = self.lanes.get(lane).replace_contents(tasks);

        let others: BTreeSet<Lane> = expired
            .iter()
            .flat_map(|pending| [pending.source(), pending.destination()])
            .filter(|other| *other != lane)
            .collect();
        for other in others {
            self.refresh(&mut state, other, &expired);
        }
        Ok((changed, expired))
    }

    fn refresh(&self, state: &mut SyncState, lane: Lane, expired: &[PendingMove]) {
        let lane_state = self.lanes.get(lane);
        if let Some(last) = state.remote.get(&lane).cloned() {
            lane_state.replace_contents(state.ledger.reconcile(last));
            return;
        }
        for pending in expired.iter().filter(|pending| pending.destination() == lane) {
            lane_state.remove_id(pending.task().id());
        }
    }

    /// Moves a task between lanes locally and records the pending move.
    ///
    /// Returns `Ok(None)` when the task is not shown in `source`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStateError`] when the ledger lock is poisoned.
    pub fn splice(
        &self,
        source: Lane,
        destination: Lane,
        task_id: &TaskId,
        destination_index: usize,
        now: DateTime<Utc>,
    ) -> Result<Option<SplicedMove>, LocalStateError> {
        let mut state = self.state()?;
        let source_state = self.lanes.get(source);
        let destination_state = self.lanes.get(destination);

        let Some(source_index) = source_state.position(task_id) else {
            return Ok(None);
        };
        let Some(task) = source_state.remove_at(source_index) else {
            return Ok(None);
        };
        let baseline: BTreeSet<TaskId> = destination_state.ids().into_iter().collect();
        let placed = destination_state.insert_at(destination_index, task.clone());
        let ticket = state.ledger.record(
            task.clone(),
            (source, source_index),
            (destination, placed),
            baseline,
            now,
        );

        Ok(Some(SplicedMove {
            ticket,
            task,
            source_index,
            destination_index: placed,
        }))
    }

    /// Returns `true` when `task_id` is the optimistic copy of a move whose
    /// destination has not been confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStateError`] when the ledger lock is poisoned.
    pub fn is_unconfirmed_copy(&self, task_id: &TaskId) -> Result<bool, LocalStateError> {
        Ok(self.state()?.ledger.is_unconfirmed_copy(task_id))
    }

    /// Records the replacement id the store assigned for a move.
    ///
    /// When the destination lane already shows the replacement, the
    /// optimistic copy is taken out and the destination side counts as
    /// confirmed. Returns `false` when the move already left the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStateError`] when the ledger lock is poisoned.
    pub fn confirm(&self, ticket: MoveTicket, new_id: TaskId) -> Result<bool, LocalStateError> {
        let mut state = self.state()?;
        let Some((destination, old_id)) = state
            .ledger
            .get(ticket)
            .map(|pending| (pending.destination(), pending.task().id().clone()))
        else {
            return Ok(false);
        };
        let lane_state = self.lanes.get(destination);
        let shown = lane_state.position(&new_id).is_some();
        state.ledger.confirm(ticket, new_id);
        if shown {
            lane_state.remove_id(&old_id);
            state.ledger.settle_destination(ticket);
        }
        Ok(true)
    }

    /// Abandons a move whose transaction failed.
    ///
    /// With `rollback` the optimistic copy is taken out of the destination
    /// lane and restored at its original source index; otherwise the lanes
    /// are left alone until the next snapshots. Returns the abandoned move.
    ///
    /// # Errors
    ///
    /// Returns [`LocalStateError`] when the ledger lock is poisoned.
    pub fn abandon(
        &self,
        ticket: MoveTicket,
        rollback: bool,
    ) -> Result<Option<PendingMove>, LocalStateError> {
        let mut state = self.state()?;
        let Some(pending) = state.ledger.remove(ticket) else {
            return Ok(None);
        };
        if rollback {
            let task = pending.task();
            self.lanes.get(pending.destination()).remove_id(task.id());
            let source_state = self.lanes.get(pending.source());
            if source_state.position(task.id()).is_none() {
                source_state.insert_at(pending.source_index(), task.clone());
            }
        }
        Ok(Some(pending))
    }
}
