//! In-memory store behaviour: collections, snapshots and transactions.

use std::sync::Arc;

use rstest::rstest;
use swimlane::board::{
    adapters::memory::InMemoryRemoteStore,
    domain::{Lane, TaskFields, TaskId},
    ports::{RemoteStore, RemoteStoreError, WriteOp, WriteOutcome},
};

use super::helpers::{SYNC_TIMEOUT, seed, shows, store, titles};

#[rstest]
#[tokio::test]
async fn subscription_starts_with_the_current_contents(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    seed(&store, Lane::Todo, &["A", "B"]).await?;

    let mut subscription = store.subscribe(Lane::Todo)?;
    let initial = tokio::time::timeout(SYNC_TIMEOUT, subscription.next())
        .await?
        .ok_or_else(|| eyre::eyre!("subscription closed"))?;

    assert_eq!(initial.lane(), Lane::Todo);
    assert_eq!(titles(initial.tasks()), vec!["A", "B"]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn every_write_publishes_the_whole_lane(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    let mut subscription = store.subscribe(Lane::Done)?;
    let _initial = subscription.next().await;

    let ids = seed(&store, Lane::Done, &["A", "B"]).await?;
    let first = subscription.next().await.ok_or_else(|| eyre::eyre!("closed"))?;
    let second = subscription.next().await.ok_or_else(|| eyre::eyre!("closed"))?;

    assert_eq!(titles(first.tasks()), vec!["A"]);
    assert_eq!(titles(second.tasks()), vec!["A", "B"]);
    assert!(ids.iter().all(|id| shows(second.tasks(), id)));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn update_keeps_the_id_and_position(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    let ids = seed(&store, Lane::InProgress, &["A", "B"]).await?;
    let first = ids.first().ok_or_else(|| eyre::eyre!("seeded two tasks"))?;

    store
        .update(Lane::InProgress, first, &TaskFields::new("A2"))
        .await?;

    let contents = store.snapshot(Lane::InProgress)?;
    assert_eq!(titles(contents.tasks()), vec!["A2", "B"]);
    assert!(shows(contents.tasks(), first));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn writes_to_missing_records_are_not_found(store: Arc<InMemoryRemoteStore>) {
    let missing = TaskId::new("missing").expect("valid id");

    let update = store
        .update(Lane::Todo, &missing, &TaskFields::new("X"))
        .await;
    let delete = store.delete(Lane::Todo, &missing).await;

    assert!(matches!(update, Err(RemoteStoreError::NotFound { .. })));
    assert!(matches!(delete, Err(RemoteStoreError::NotFound { .. })));
}

#[rstest]
#[tokio::test]
async fn transaction_moves_a_record_with_a_new_id(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    let ids = seed(&store, Lane::Todo, &["A"]).await?;
    let old_id = ids.first().ok_or_else(|| eyre::eyre!("seeded one task"))?;

    let outcomes = store
        .transact(vec![
            WriteOp::Delete {
                lane: Lane::Todo,
                id: old_id.clone(),
            },
            WriteOp::Insert {
                lane: Lane::Done,
                fields: TaskFields::new("A"),
            },
        ])
        .await?;

    let Some(WriteOutcome::Inserted { lane, id: new_id }) = outcomes.last() else {
        return Err(eyre::eyre!("expected an insert outcome, got {outcomes:?}"));
    };
    assert_eq!(*lane, Lane::Done);
    assert_ne!(new_id, old_id);
    assert!(store.snapshot(Lane::Todo)?.tasks().is_empty());
    assert!(shows(store.snapshot(Lane::Done)?.tasks(), new_id));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn failing_transaction_changes_nothing(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    seed(&store, Lane::Todo, &["A"]).await?;

    let result = store
        .transact(vec![
            WriteOp::Insert {
                lane: Lane::Done,
                fields: TaskFields::new("A"),
            },
            WriteOp::Delete {
                lane: Lane::Todo,
                id: TaskId::new("missing")?,
            },
        ])
        .await;

    assert!(matches!(result, Err(RemoteStoreError::NotFound { .. })));
    assert_eq!(titles(store.snapshot(Lane::Todo)?.tasks()), vec!["A"]);
    assert!(store.snapshot(Lane::Done)?.tasks().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn queued_rejection_fails_exactly_one_transaction(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    store.reject_next_transaction("quota exceeded")?;
    let insert = || {
        vec![WriteOp::Insert {
            lane: Lane::Todo,
            fields: TaskFields::new("A"),
        }]
    };

    let rejected = store.transact(insert()).await;
    let accepted = store.transact(insert()).await;

    assert!(matches!(
        rejected,
        Err(RemoteStoreError::Rejected(reason)) if reason == "quota exceeded"
    ));
    assert!(accepted.is_ok());
    assert_eq!(store.snapshot(Lane::Todo)?.tasks().len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn offline_store_refuses_writes(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    store.set_available(false)?;

    let insert = store.insert(Lane::Todo, &TaskFields::new("A")).await;
    store.set_available(true)?;
    let retried = store.insert(Lane::Todo, &TaskFields::new("A")).await;

    assert!(matches!(insert, Err(RemoteStoreError::Unavailable(_))));
    assert!(retried.is_ok());
    Ok(())
}
