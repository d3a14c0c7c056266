//! Edits reaching the board lanes through store snapshots.

use std::sync::Arc;

use rstest::rstest;
use swimlane::board::{
    adapters::memory::InMemoryRemoteStore,
    domain::{Lane, Task, TaskFields},
    ports::RemoteStore,
    services::{EditError, EditOutcome, ReconcilerHandle, TaskDialogResult},
};

use super::helpers::{TestBoard, board_over, seed, shows, store, titles, wait_for_lane};

async fn started_with_one_todo(
    store: &Arc<InMemoryRemoteStore>,
) -> Result<(TestBoard, ReconcilerHandle, Task), eyre::Report> {
    seed(store, Lane::Todo, &["A"]).await?;
    let board = board_over(store);
    let sync = board.start()?;
    let todo = wait_for_lane(&board, Lane::Todo, |tasks| tasks.len() == 1).await?;
    let shown = todo
        .into_iter()
        .next()
        .ok_or_else(|| eyre::eyre!("todo shows one task"))?;
    Ok((board, sync, shown))
}

#[rstest]
#[tokio::test]
async fn saved_dialog_updates_the_task_in_place(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    let (board, _sync, shown) = started_with_one_todo(&store).await?;
    let edited = Task::new(
        shown.id().clone(),
        TaskFields::new("A2").with_description("reworded"),
    );

    let outcome = board
        .edit(Lane::Todo, &shown, Some(TaskDialogResult::save(edited)))
        .await?;
    let todo = wait_for_lane(&board, Lane::Todo, |tasks| titles(tasks) == ["A2"]).await?;

    assert_eq!(outcome, EditOutcome::Saved);
    assert!(shows(&todo, shown.id()));
    assert!(todo.iter().all(|task| task.fields().description() == "reworded"));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn deleted_dialog_removes_the_task(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    let (board, _sync, shown) = started_with_one_todo(&store).await?;

    let outcome = board
        .edit(
            Lane::Todo,
            &shown,
            Some(TaskDialogResult::delete(shown.clone())),
        )
        .await?;
    wait_for_lane(&board, Lane::Todo, Vec::is_empty).await?;

    assert_eq!(outcome, EditOutcome::Deleted);
    assert!(store.snapshot(Lane::Todo)?.tasks().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn dismissed_dialog_leaves_the_store_alone(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    let (board, _sync, shown) = started_with_one_todo(&store).await?;

    let outcome = board.edit(Lane::Todo, &shown, None).await?;

    assert_eq!(outcome, EditOutcome::Cancelled);
    assert_eq!(store.snapshot(Lane::Todo)?.into_tasks(), vec![shown]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn new_task_appears_in_todo(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    let (board, _sync, _shown) = started_with_one_todo(&store).await?;

    let created = board.new_task(&TaskFields::new("Fresh")).await?;
    let todo = wait_for_lane(&board, Lane::Todo, |tasks| shows(tasks, &created)).await?;

    assert_eq!(titles(&todo), vec!["A", "Fresh"]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn saving_a_task_deleted_elsewhere_is_not_found(
    store: Arc<InMemoryRemoteStore>,
) -> Result<(), eyre::Report> {
    let (board, _sync, shown) = started_with_one_todo(&store).await?;
    store.delete(Lane::Todo, shown.id()).await?;

    let result = board.save(Lane::Todo, &shown).await;

    assert!(matches!(
        result,
        Err(EditError::NotFound {
            lane: Lane::Todo,
            ..
        })
    ));
    Ok(())
}
