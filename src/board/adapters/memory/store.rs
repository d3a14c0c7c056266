//! In-memory remote store for board tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::board::{
    domain::{Lane, LaneSnapshot, Task, TaskFields, TaskId},
    ports::{
        LaneSubscription, RemoteStore, RemoteStoreError, RemoteStoreResult, WriteOp, WriteOutcome,
    },
};

/// Default number of snapshots buffered per subscriber.
const DEFAULT_CAPACITY: usize = 64;

/// Thread-safe in-memory document store with one collection per lane.
///
/// Every committed change publishes a full snapshot of each affected lane
/// while the state lock is held, so subscribers see snapshots in commit
/// order. Availability can be toggled and individual transactions rejected
/// to exercise failure paths.
#[derive(Debug, Clone)]
pub struct InMemoryRemoteStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

#[derive(Debug)]
struct InMemoryStoreState {
    collections: HashMap<Lane, Vec<Task>>,
    channels: HashMap<Lane, broadcast::Sender<LaneSnapshot>>,
    available: bool,
    rejections: Vec<String>,
}

impl InMemoryStoreState {
    fn snapshot(&self, lane: Lane) -> LaneSnapshot {
        LaneSnapshot::new(
            lane,
            self.collections.get(&lane).cloned().unwrap_or_default(),
        )
    }

    fn publish(&self, lane: Lane) {
        if let Some(sender) = self.channels.get(&lane) {
            // No subscribers is fine: the collection stays authoritative.
            let _receivers = sender.send(self.snapshot(lane)).unwrap_or(0);
        }
    }

    fn ensure_available(&self) -> RemoteStoreResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(RemoteStoreError::Unavailable(
                "in-memory store is offline".to_owned(),
            ))
        }
    }

    fn position(&self, lane: Lane, id: &TaskId) -> RemoteStoreResult<usize> {
        self.collections
            .get(&lane)
            .and_then(|tasks| tasks.iter().position(|task| task.id() == id))
            .ok_or_else(|| RemoteStoreError::NotFound {
                lane,
                task_id: id.clone(),
            })
    }

    fn push(&mut self, lane: Lane, fields: TaskFields) -> TaskId {
        let id = TaskId::from_uuid(Uuid::new_v4());
        self.collections
            .entry(lane)
            .or_default()
            .push(Task::new(id.clone(), fields));
        id
    }

    fn remove(&mut self, lane: Lane, id: &TaskId) -> RemoteStoreResult<()> {
        let index = self.position(lane, id)?;
        if let Some(tasks) = self.collections.get_mut(&lane) {
            tasks.remove(index);
        }
        Ok(())
    }
}

impl InMemoryRemoteStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty store buffering `capacity` snapshots per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let channels = Lane::ALL
            .into_iter()
            .map(|lane| (lane, broadcast::channel(capacity).0))
            .collect();
        Self {
            state: Arc::new(RwLock::new(InMemoryStoreState {
                collections: HashMap::new(),
                channels,
                available: true,
                rejections: Vec::new(),
            })),
        }
    }

    fn write(&self) -> RemoteStoreResult<RwLockWriteGuard<'_, InMemoryStoreState>> {
        self.state
            .write()
            .map_err(|err| RemoteStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    /// Takes the store offline or back online.
    ///
    /// While offline every write and transaction fails with
    /// [`RemoteStoreError::Unavailable`]; subscriptions stay open.
    ///
    /// # Errors
    ///
    /// Returns persistence errors when lock acquisition fails.
    pub fn set_available(&self, available: bool) -> RemoteStoreResult<()> {
        self.write()?.available = available;
        Ok(())
    }

    /// Makes the next transaction fail with [`RemoteStoreError::Rejected`].
    ///
    /// Queued rejections are consumed one per transaction, in order.
    ///
    /// # Errors
    ///
    /// Returns persistence errors when lock acquisition fails.
    pub fn reject_next_transaction(&self, reason: impl Into<String>) -> RemoteStoreResult<()> {
        self.write()?.rejections.push(reason.into());
        Ok(())
    }

    /// Publishes the lane's current contents again without any change.
    ///
    /// Mirrors a subscription channel redelivering a snapshot.
    ///
    /// # Errors
    ///
    /// Returns persistence errors when lock acquisition fails.
    pub fn republish(&self, lane: Lane) -> RemoteStoreResult<()> {
        self.write()?.publish(lane);
        Ok(())
    }

    /// Returns the lane's current contents.
    ///
    /// # Errors
    ///
    /// Returns persistence errors when lock acquisition fails.
    pub fn snapshot(&self, lane: Lane) -> RemoteStoreResult<LaneSnapshot> {
        let state = self.state.read().map_err(|err| {
            RemoteStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.snapshot(lane))
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    fn subscribe(&self, lane: Lane) -> RemoteStoreResult<LaneSubscription> {
        // Write lock: no snapshot may be published between the initial
        // snapshot and the receiver being registered.
        let state = self.write()?;
        let receiver = state
            .channels
            .get(&lane)
            .map(broadcast::Sender::subscribe)
            .ok_or_else(|| RemoteStoreError::Rejected(format!("no collection for lane {lane}")))?;
        Ok(LaneSubscription::new(
            lane,
            Some(state.snapshot(lane)),
            receiver,
        ))
    }

    async fn insert(&self, lane: Lane, fields: &TaskFields) -> RemoteStoreResult<TaskId> {
        let mut state = self.write()?;
        state.ensure_available()?;
        let id = state.push(lane, fields.clone());
        state.publish(lane);
        Ok(id)
    }

    async fn delete(&self, lane: Lane, id: &TaskId) -> RemoteStoreResult<()> {
        let mut state = self.write()?;
        state.ensure_available()?;
        state.remove(lane, id)?;
        state.publish(lane);
        Ok(())
    }

    async fn update(&self, lane: Lane, id: &TaskId, fields: &TaskFields) -> RemoteStoreResult<()> {
        let mut state = self.write()?;
        state.ensure_available()?;
        let index = state.position(lane, id)?;
        if let Some(slot) = state
            .collections
            .get_mut(&lane)
            .and_then(|tasks| tasks.get_mut(index))
        {
            *slot = Task::new(id.clone(), fields.clone());
        }
        state.publish(lane);
        Ok(())
    }

    async fn transact(&self, ops: Vec<WriteOp>) -> RemoteStoreResult<Vec<WriteOutcome>> {
        let mut state = self.write()?;
        state.ensure_available()?;
        if !state.rejections.is_empty() {
            let reason = state.rejections.remove(0);
            return Err(RemoteStoreError::Rejected(reason));
        }

        // Restored when any op fails: all or nothing.
        let original = state.collections.clone();
        let mut outcomes = Vec::with_capacity(ops.len());
        let mut touched: Vec<Lane> = Vec::new();
        for op in ops {
            let result = match op {
                WriteOp::Insert { lane, fields } => {
                    let id = state.push(lane, fields);
                    Ok(WriteOutcome::Inserted { lane, id })
                }
                WriteOp::Delete { lane, id } => state
                    .remove(lane, &id)
                    .map(|()| WriteOutcome::Deleted { lane, id }),
            };
            match result {
                Ok(outcome) => {
                    let lane = match &outcome {
                        WriteOutcome::Inserted { lane, .. } | WriteOutcome::Deleted { lane, .. } => {
                            *lane
                        }
                    };
                    if !touched.contains(&lane) {
                        touched.push(lane);
                    }
                    outcomes.push(outcome);
                }
                Err(err) => {
                    state.collections = original;
                    return Err(err);
                }
            }
        }

        for lane in touched {
            state.publish(lane);
        }
        Ok(outcomes)
    }
}
