//! Observable, mutable-in-place lane contents.
//!
//! A [`LaneState`] is the list the UI renders. It is a shared handle: every
//! clone refers to the same underlying list, so a component that captured
//! the handle before a mutation observes the mutation without subscribing
//! again. Contents change in place; the handle itself is never replaced.

use super::{Lane, Task, TaskId};
use std::sync::Arc;
use tokio::sync::watch;

/// Believed contents of one lane.
#[derive(Debug, Clone)]
pub struct LaneState {
    lane: Lane,
    sender: Arc<watch::Sender<Vec<Task>>>,
}

impl LaneState {
    /// Creates an empty lane state.
    #[must_use]
    pub fn new(lane: Lane) -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            lane,
            sender: Arc::new(sender),
        }
    }

    /// Returns the lane this state belongs to.
    #[must_use]
    pub const fn lane(&self) -> Lane {
        self.lane
    }

    /// Returns a copy of the current contents.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.sender.borrow().clone()
    }

    /// Returns the identifiers of the current contents, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<TaskId> {
        self.sender
            .borrow()
            .iter()
            .map(|task| task.id().clone())
            .collect()
    }

    /// Returns the number of tasks currently shown.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sender.borrow().len()
    }

    /// Returns `true` when the lane shows no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the task at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Task> {
        self.sender.borrow().get(index).cloned()
    }

    /// Returns the position of the task with the given id.
    #[must_use]
    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.sender.borrow().iter().position(|task| task.id() == id)
    }

    /// Returns an observer of this lane.
    #[must_use]
    pub fn observe(&self) -> LaneObserver {
        LaneObserver {
            lane: self.lane,
            receiver: self.sender.subscribe(),
        }
    }

    /// Returns `true` when both handles refer to the same lane state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.sender, &other.sender)
    }

    /// Removes and returns the task at `index`.
    pub fn remove_at(&self, index: usize) -> Option<Task> {
        let mut removed = None;
        self.sender.send_if_modified(|tasks| {
            if index < tasks.len() {
                removed = Some(tasks.remove(index));
                true
            } else {
                false
            }
        });
        removed
    }

    /// Removes and returns the task with the given id.
    pub fn remove_id(&self, id: &TaskId) -> Option<Task> {
        self.position(id).and_then(|index| self.remove_at(index))
    }

    /// Inserts a task at `index`, clamped to the current length.
    ///
    /// Returns the index the task was placed at.
    pub fn insert_at(&self, index: usize, task: Task) -> usize {
        let mut placed = index;
        self.sender.send_modify(|tasks| {
            placed = index.min(tasks.len());
            tasks.insert(placed, task);
        });
        placed
    }

    /// Replaces the contents in place.
    ///
    /// Observers are notified only when the new contents differ from the
    /// current ones. Returns whether anything changed.
    pub fn replace_contents(&self, next: Vec<Task>) -> bool {
        self.sender.send_if_modified(|tasks| {
            if *tasks == next {
                return false;
            }
            tasks.clear();
            tasks.extend(next);
            true
        })
    }
}

/// Read side of a [`LaneState`], for renderers waiting on changes.
#[derive(Debug, Clone)]
pub struct LaneObserver {
    lane: Lane,
    receiver: watch::Receiver<Vec<Task>>,
}

impl LaneObserver {
    /// Returns the observed lane.
    #[must_use]
    pub const fn lane(&self) -> Lane {
        self.lane
    }

    /// Returns a copy of the current contents and marks them as seen.
    pub fn current(&mut self) -> Vec<Task> {
        self.receiver.borrow_and_update().clone()
    }

    /// Returns `true` when the contents changed since the last
    /// [`Self::current`].
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Waits until the contents change after the last [`Self::current`].
    ///
    /// Returns `false` once the lane state has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Waits until the contents satisfy `predicate` and returns them.
    ///
    /// Returns `None` when the lane state is dropped first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&Vec<Task>) -> bool,
    ) -> Option<Vec<Task>> {
        self.receiver
            .wait_for(predicate)
            .await
            .ok()
            .map(|tasks| tasks.clone())
    }
}

/// The three lane states of a board.
///
/// Cloning shares the underlying lanes.
#[derive(Debug, Clone)]
pub struct LaneSet {
    todo: LaneState,
    in_progress: LaneState,
    done: LaneState,
}

impl LaneSet {
    /// Creates three empty lanes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            todo: LaneState::new(Lane::Todo),
            in_progress: LaneState::new(Lane::InProgress),
            done: LaneState::new(Lane::Done),
        }
    }

    /// Returns the state for `lane`.
    #[must_use]
    pub const fn get(&self, lane: Lane) -> &LaneState {
        match lane {
            Lane::Todo => &self.todo,
            Lane::InProgress => &self.in_progress,
            Lane::Done => &self.done,
        }
    }

    /// Iterates over the lanes in display order.
    pub fn iter(&self) -> impl Iterator<Item = &LaneState> {
        Lane::ALL.into_iter().map(|lane| self.get(lane))
    }

    /// Returns the ids shown across all lanes.
    #[must_use]
    pub fn all_ids(&self) -> Vec<TaskId> {
        self.iter().flat_map(LaneState::ids).collect()
    }
}

impl Default for LaneSet {
    fn default() -> Self {
        Self::new()
    }
}
