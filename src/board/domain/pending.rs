//! Ledger of optimistic moves awaiting confirmation from the store.
//!
//! Between the local splice of a move and the store's snapshots reflecting
//! it, snapshots for either lane may still describe the pre-move world. The
//! ledger rewrites such snapshots so the task stays where the user dropped
//! it:
//!
//! - the source lane hides the moved id until a snapshot omits it;
//! - the destination lane keeps the optimistic copy until the store's
//!   replacement document shows up.
//!
//! The replacement is recognised by its new id once the transaction has
//! reported it, or earlier by being a document that was not in the
//! destination lane at splice time and carries the same fields. A document
//! is the replacement of at most one move. Moves into the same lane whose
//! fields are equal wait for their reported ids instead of guessing.

use super::{Lane, LaneSnapshot, MoveTicket, Task, TaskId};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// One optimistic move not yet confirmed by snapshots for both lanes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    task: Task,
    source: Lane,
    source_index: usize,
    destination: Lane,
    destination_index: usize,
    destination_baseline: BTreeSet<TaskId>,
    confirmed_id: Option<TaskId>,
    source_settled: bool,
    destination_settled: bool,
    issued_at: DateTime<Utc>,
}

impl PendingMove {
    /// Returns the optimistic task copy (carrying its pre-move id).
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Returns the lane the task left.
    #[must_use]
    pub const fn source(&self) -> Lane {
        self.source
    }

    /// Returns the index the task occupied in the source lane.
    #[must_use]
    pub const fn source_index(&self) -> usize {
        self.source_index
    }

    /// Returns the lane the task was dropped into.
    #[must_use]
    pub const fn destination(&self) -> Lane {
        self.destination
    }

    /// Returns the index the task was dropped at.
    #[must_use]
    pub const fn destination_index(&self) -> usize {
        self.destination_index
    }

    /// Returns the store-assigned replacement id, once known.
    #[must_use]
    pub const fn confirmed_id(&self) -> Option<&TaskId> {
        self.confirmed_id.as_ref()
    }

    /// Returns when the move was spliced locally.
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Returns `true` once snapshots for both lanes reflect the move.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.source_settled && self.destination_settled
    }

    fn is_expired(&self, now: DateTime<Utc>, settle_timeout: Duration) -> bool {
        let Ok(elapsed) = (now - self.issued_at).to_std() else {
            return false;
        };
        elapsed >= settle_timeout
    }

    fn replacement_present(
        &mut self,
        tasks: &[Task],
        claimed: &BTreeSet<TaskId>,
        match_fields: bool,
    ) -> bool {
        if let Some(confirmed) = &self.confirmed_id {
            return tasks.iter().any(|task| task.id() == confirmed);
        }
        if !match_fields {
            return false;
        }
        let replacement = tasks.iter().find(|task| {
            task.id() != self.task.id()
                && !claimed.contains(task.id())
                && !self.destination_baseline.contains(task.id())
                && task.fields() == self.task.fields()
        });
        match replacement {
            Some(task) => {
                self.confirmed_id = Some(task.id().clone());
                true
            }
            None => false,
        }
    }

    fn awaits_destination(&self, lane: Lane) -> bool {
        self.destination == lane && !self.destination_settled
    }
}

/// All moves currently awaiting confirmation, keyed by ticket.
#[derive(Debug, Default)]
pub struct PendingLedger {
    moves: BTreeMap<MoveTicket, PendingMove>,
    next_ticket: u64,
}

impl PendingLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a move that has just been spliced locally.
    ///
    /// `destination_baseline` lists the ids shown in the destination lane
    /// before the optimistic copy was inserted.
    pub fn record(
        &mut self,
        task: Task,
        (source, source_index): (Lane, usize),
        (destination, destination_index): (Lane, usize),
        destination_baseline: BTreeSet<TaskId>,
        issued_at: DateTime<Utc>,
    ) -> MoveTicket {
        self.next_ticket += 1;
        let ticket = MoveTicket::new(self.next_ticket);
        self.moves.insert(
            ticket,
            PendingMove {
                task,
                source,
                source_index,
                destination,
                destination_index,
                destination_baseline,
                confirmed_id: None,
                source_settled: false,
                destination_settled: false,
                issued_at,
            },
        );
        ticket
    }

    /// Returns the pending move for a ticket.
    #[must_use]
    pub fn get(&self, ticket: MoveTicket) -> Option<&PendingMove> {
        self.moves.get(&ticket)
    }

    /// Returns the number of unsettled moves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Returns `true` when no move is awaiting confirmation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Returns `true` when `id` is an optimistic copy whose destination side
    /// has not been confirmed yet.
    #[must_use]
    pub fn is_unconfirmed_copy(&self, id: &TaskId) -> bool {
        self.moves
            .values()
            .any(|pending| !pending.destination_settled && pending.task.id() == id)
    }

    /// Stores the replacement id reported by a committed transaction.
    ///
    /// Returns `false` when the move already left the ledger.
    pub fn confirm(&mut self, ticket: MoveTicket, new_id: TaskId) -> bool {
        match self.moves.get_mut(&ticket) {
            Some(pending) => {
                pending.confirmed_id = Some(new_id);
                true
            }
            None => false,
        }
    }

    /// Removes a move from the ledger, returning it.
    pub fn remove(&mut self, ticket: MoveTicket) -> Option<PendingMove> {
        self.moves.remove(&ticket)
    }

    /// Drops every move older than `settle_timeout`, returning them.
    pub fn expire(&mut self, now: DateTime<Utc>, settle_timeout: Duration) -> Vec<PendingMove> {
        let expired: Vec<MoveTicket> = self
            .moves
            .iter()
            .filter(|(_, pending)| pending.is_expired(now, settle_timeout))
            .map(|(ticket, _)| *ticket)
            .collect();
        expired
            .into_iter()
            .filter_map(|ticket| self.moves.remove(&ticket))
            .collect()
    }

    /// Marks the destination side of a move as confirmed.
    ///
    /// Used once the lane already shows the reported replacement. The move
    /// leaves the ledger when its source side has settled too.
    pub fn settle_destination(&mut self, ticket: MoveTicket) {
        if let Some(pending) = self.moves.get_mut(&ticket) {
            pending.destination_settled = true;
            if pending.is_settled() {
                self.moves.remove(&ticket);
            }
        }
    }

    /// Tickets of unconfirmed moves into `lane` that share their fields with
    /// another such move.
    fn ambiguous_moves(&self, lane: Lane) -> BTreeSet<MoveTicket> {
        let unconfirmed: Vec<(MoveTicket, &Task)> = self
            .moves
            .iter()
            .filter(|(_, pending)| {
                pending.awaits_destination(lane) && pending.confirmed_id.is_none()
            })
            .map(|(ticket, pending)| (*ticket, &pending.task))
            .collect();
        unconfirmed
            .iter()
            .filter(|(ticket, task)| {
                unconfirmed
                    .iter()
                    .any(|(other, peer)| other != ticket && peer.fields() == task.fields())
            })
            .map(|(ticket, _)| *ticket)
            .collect()
    }

    /// Rewrites an incoming snapshot so unconfirmed moves stay visible.
    ///
    /// Moves settled on both sides by this snapshot leave the ledger.
    pub fn reconcile(&mut self, snapshot: LaneSnapshot) -> Vec<Task> {
        let lane = snapshot.lane();
        let mut tasks = snapshot.into_tasks();

        for pending in self.moves.values_mut() {
            if pending.source == lane && !pending.source_settled {
                let before = tasks.len();
                tasks.retain(|task| task.id() != pending.task.id());
                if tasks.len() == before {
                    pending.source_settled = true;
                }
            }
        }

        let mut claimed: BTreeSet<TaskId> = self
            .moves
            .values()
            .filter_map(|pending| pending.confirmed_id.clone())
            .collect();
        let ambiguous = self.ambiguous_moves(lane);

        for (ticket, pending) in &mut self.moves {
            if !pending.awaits_destination(lane) {
                continue;
            }
            let match_fields = !ambiguous.contains(ticket);
            if pending.replacement_present(&tasks, &claimed, match_fields) {
                pending.destination_settled = true;
                claimed.extend(pending.confirmed_id.clone());
            } else if !tasks.iter().any(|task| task.id() == pending.task.id()) {
                let index = pending.destination_index.min(tasks.len());
                tasks.insert(index, pending.task.clone());
            }
        }

        self.moves.retain(|_, pending| !pending.is_settled());
        tasks
    }
}
