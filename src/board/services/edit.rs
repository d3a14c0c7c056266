//! Single-record edits: save, delete and new tasks.
//!
//! Edits never touch local lane state. The lane's next snapshot carries the
//! change because the record stays in the same lane with the same id.

use crate::board::{
    domain::{Lane, Task, TaskFields, TaskId},
    ports::{RemoteStore, RemoteStoreError},
};
use std::sync::Arc;
use thiserror::Error;

/// Outcome of the task editor dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDialogResult {
    task: Task,
    delete: bool,
}

impl TaskDialogResult {
    /// The user saved the dialog with the given task content.
    #[must_use]
    pub const fn save(task: Task) -> Self {
        Self {
            task,
            delete: false,
        }
    }

    /// The user asked for the task to be deleted.
    #[must_use]
    pub const fn delete(task: Task) -> Self {
        Self { task, delete: true }
    }

    /// Returns the task as edited in the dialog.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Returns `true` when the user asked for deletion.
    #[must_use]
    pub const fn is_delete(&self) -> bool {
        self.delete
    }
}

/// What an edit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The record's fields were updated.
    Saved,
    /// The record was deleted.
    Deleted,
    /// The dialog was dismissed; nothing was sent.
    Cancelled,
}

/// Errors raised by edit operations.
#[derive(Debug, Error)]
pub enum EditError {
    /// The record no longer exists in the lane.
    #[error("task {task_id} not found in lane {lane}")]
    NotFound {
        /// Lane that was edited.
        lane: Lane,
        /// Missing identifier.
        task_id: TaskId,
    },

    /// The store rejected or failed the update.
    #[error("failed to update task {task_id} in lane {lane}: {source}")]
    UpdateFailed {
        /// Lane that was edited.
        lane: Lane,
        /// Edited identifier.
        task_id: TaskId,
        /// Underlying store error.
        source: RemoteStoreError,
    },

    /// The store rejected or failed the delete.
    #[error("failed to delete task {task_id} from lane {lane}: {source}")]
    DeleteFailed {
        /// Lane that was edited.
        lane: Lane,
        /// Deleted identifier.
        task_id: TaskId,
        /// Underlying store error.
        source: RemoteStoreError,
    },

    /// The store rejected or failed the insert of a new task.
    #[error("failed to add task to lane {lane}: {source}")]
    InsertFailed {
        /// Target lane.
        lane: Lane,
        /// Underlying store error.
        source: RemoteStoreError,
    },
}

/// Result type for edit operations.
pub type EditResult<T> = Result<T, EditError>;

/// Saves, deletes and creates single tasks.
pub struct EditCoordinator<S: RemoteStore> {
    store: Arc<S>,
}

impl<S: RemoteStore> Clone for EditCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RemoteStore> EditCoordinator<S> {
    /// Creates an edit coordinator.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Writes the task's fields to its record in `lane`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::NotFound`] when the record is gone and
    /// [`EditError::UpdateFailed`] for any other store failure.
    pub async fn save(&self, lane: Lane, task: &Task) -> EditResult<()> {
        let result = self.store.update(lane, task.id(), task.fields()).await;
        result.map_err(|source| {
            tracing::warn!(
                %lane,
                task_id = %task.id(),
                error = %source,
                "task update failed"
            );
            match source {
                RemoteStoreError::NotFound {
                    lane: missing_lane,
                    task_id,
                } => EditError::NotFound {
                    lane: missing_lane,
                    task_id,
                },
                other => EditError::UpdateFailed {
                    lane,
                    task_id: task.id().clone(),
                    source: other,
                },
            }
        })
    }

    /// Deletes the task's record from `lane`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::NotFound`] when the record is gone and
    /// [`EditError::DeleteFailed`] for any other store failure.
    pub async fn delete(&self, lane: Lane, task: &Task) -> EditResult<()> {
        let result = self.store.delete(lane, task.id()).await;
        result.map_err(|source| {
            tracing::warn!(
                %lane,
                task_id = %task.id(),
                error = %source,
                "task delete failed"
            );
            match source {
                RemoteStoreError::NotFound {
                    lane: missing_lane,
                    task_id,
                } => EditError::NotFound {
                    lane: missing_lane,
                    task_id,
                },
                other => EditError::DeleteFailed {
                    lane,
                    task_id: task.id().clone(),
                    source: other,
                },
            }
        })
    }

    /// Routes an editor dialog result for `task` shown in `lane`.
    ///
    /// A dismissed dialog (`None`) sends nothing. Saved content is written
    /// under `task`'s id whatever id the dialog result carries.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::save`] and [`Self::delete`].
    pub async fn apply_dialog(
        &self,
        lane: Lane,
        task: &Task,
        result: Option<TaskDialogResult>,
    ) -> EditResult<EditOutcome> {
        let Some(result) = result else {
            return Ok(EditOutcome::Cancelled);
        };
        if result.delete {
            self.delete(lane, task).await?;
            return Ok(EditOutcome::Deleted);
        }
        let edited = task.with_fields(result.task.into_fields());
        self.save(lane, &edited).await?;
        Ok(EditOutcome::Saved)
    }

    /// Adds a new task to the `todo` lane and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InsertFailed`] when the store rejects the insert.
    pub async fn new_task(&self, fields: &TaskFields) -> EditResult<TaskId> {
        let lane = Lane::Todo;
        let id = self.store.insert(lane, fields).await.map_err(|source| {
            tracing::warn!(%lane, error = %source, "task insert failed");
            EditError::InsertFailed { lane, source }
        })?;
        tracing::debug!(%lane, task_id = %id, "task added");
        Ok(id)
    }
}
