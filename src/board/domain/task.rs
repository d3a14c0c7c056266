//! Task documents and lane snapshots.

use super::{Lane, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Editable content of a task document, everything except its identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TaskFields {
    /// Creates fields with the given title and an empty description.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            extra: Map::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets an additional display field.
    ///
    /// `id`, `title` and `description` are reserved and ignored here.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        let name = key.into();
        if !matches!(name.as_str(), "id" | "title" | "description") {
            self.extra.insert(name, value);
        }
        self
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns an additional display field by name.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Returns all additional display fields.
    #[must_use]
    pub const fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// A task document as held in a lane.
///
/// Two tasks with the same id are the same logical entity even when their
/// fields differ; see [`Task::same_entity`]. `PartialEq` compares fields too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    #[serde(flatten)]
    fields: TaskFields,
}

impl Task {
    /// Creates a task from its store identifier and content.
    #[must_use]
    pub const fn new(id: TaskId, fields: TaskFields) -> Self {
        Self { id, fields }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Returns the task content.
    #[must_use]
    pub const fn fields(&self) -> &TaskFields {
        &self.fields
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.fields.title()
    }

    /// Returns a copy of this task carrying different content.
    #[must_use]
    pub fn with_fields(&self, fields: TaskFields) -> Self {
        Self {
            id: self.id.clone(),
            fields,
        }
    }

    /// Consumes the task, returning its content.
    #[must_use]
    pub fn into_fields(self) -> TaskFields {
        self.fields
    }

    /// Returns `true` when both values refer to the same stored document.
    #[must_use]
    pub fn same_entity(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Complete, ordered listing of one lane as pushed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSnapshot {
    lane: Lane,
    tasks: Vec<Task>,
}

impl LaneSnapshot {
    /// Creates a snapshot for a lane.
    #[must_use]
    pub const fn new(lane: Lane, tasks: Vec<Task>) -> Self {
        Self { lane, tasks }
    }

    /// Returns the lane this snapshot describes.
    #[must_use]
    pub const fn lane(&self) -> Lane {
        self.lane
    }

    /// Returns the tasks in store order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Consumes the snapshot, returning its tasks.
    #[must_use]
    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    /// Returns `true` when the snapshot lists the given id.
    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.iter().any(|task| task.id() == id)
    }
}
