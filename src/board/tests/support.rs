//! Shared builders and the mocked store port.

use crate::board::{
    domain::{Lane, LaneSnapshot, Task, TaskFields, TaskId},
    ports::{LaneSubscription, RemoteStore, RemoteStoreResult, WriteOp, WriteOutcome},
};
use async_trait::async_trait;
use mockall::mock;

mock! {
    pub Store {}

    #[async_trait]
    impl RemoteStore for Store {
        fn subscribe(&self, lane: Lane) -> RemoteStoreResult<LaneSubscription>;
        async fn insert(&self, lane: Lane, fields: &TaskFields) -> RemoteStoreResult<TaskId>;
        async fn delete(&self, lane: Lane, id: &TaskId) -> RemoteStoreResult<()>;
        async fn update(
            &self,
            lane: Lane,
            id: &TaskId,
            fields: &TaskFields,
        ) -> RemoteStoreResult<()>;
        async fn transact(&self, ops: Vec<WriteOp>) -> RemoteStoreResult<Vec<WriteOutcome>>;
    }
}

pub fn id(value: &str) -> TaskId {
    TaskId::new(value).expect("test ids are non-empty")
}

pub fn task(task_id: &str, title: &str) -> Task {
    Task::new(id(task_id), TaskFields::new(title))
}

pub fn snapshot(lane: Lane, tasks: &[Task]) -> LaneSnapshot {
    LaneSnapshot::new(lane, tasks.to_vec())
}

pub fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|task| task.id().as_str()).collect()
}
