//! Shared world state for task board BDD scenarios.

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;
use rstest::fixture;
use swimlane::{
    board::{
        adapters::memory::InMemoryRemoteStore,
        domain::{Lane, Task, TaskId},
        services::{MoveHandle, MoveResult, ReconcilerHandle, TaskBoard},
    },
    config::BoardConfig,
};

/// Board type used by the BDD world.
pub type TestBoard = TaskBoard<InMemoryRemoteStore, DefaultClock>;

const SYNC_TIMEOUT: Duration = Duration::from_secs(2);

/// Scenario world for task board behaviour tests.
pub struct BoardWorld {
    pub store: Arc<InMemoryRemoteStore>,
    pub board: TestBoard,
    pub sync: Option<ReconcilerHandle>,
    pub move_started: Option<bool>,
    pub pending_move: Option<MoveHandle>,
    pub move_result: Option<MoveResult<TaskId>>,
    pub edited_task: Option<TaskId>,
}

impl BoardWorld {
    /// Creates a world around an empty store.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryRemoteStore::new());
        let board = TaskBoard::new(
            Arc::clone(&store),
            Arc::new(DefaultClock),
            BoardConfig::default(),
        );
        Self {
            store,
            board,
            sync: None,
            move_started: None,
            pending_move: None,
            move_result: None,
            edited_task: None,
        }
    }

    /// Finds the task titled `title` in `lane` and returns it with its index.
    ///
    /// # Errors
    ///
    /// Returns an error if the lane shows no such task.
    pub fn task_titled(&self, lane: Lane, title: &str) -> Result<(usize, Task), eyre::Report> {
        self.board
            .lane(lane)
            .tasks()
            .into_iter()
            .enumerate()
            .find(|(_, task)| task.title() == title)
            .ok_or_else(|| eyre::eyre!("lane {lane} shows no task titled {title:?}"))
    }

    /// Waits until `lane` satisfies `predicate` and returns its contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the lane does not get there in time.
    pub fn wait_for_lane(
        &self,
        lane: Lane,
        predicate: impl FnMut(&Vec<Task>) -> bool,
    ) -> Result<Vec<Task>, eyre::Report> {
        let mut observer = self.board.lane(lane).observe();
        run_async(async {
            tokio::time::timeout(SYNC_TIMEOUT, observer.wait_for(predicate))
                .await
                .map_err(|_| eyre::eyre!("lane {lane} did not reach the expected contents"))?
                .ok_or_else(|| eyre::eyre!("lane {lane} was dropped"))
        })
    }

    /// Waits until every pending move has been confirmed by snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if moves are still pending in time.
    pub fn wait_until_settled(&self) -> Result<(), eyre::Report> {
        run_async(async {
            let settle = async {
                while !self.board.is_settled()? {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Ok::<(), eyre::Report>(())
            };
            tokio::time::timeout(SYNC_TIMEOUT, settle)
                .await
                .map_err(|_| eyre::eyre!("pending moves did not settle"))?
        })
    }
}

impl Default for BoardWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> BoardWorld {
    BoardWorld::default()
}

/// Parses a lane name used in feature files.
///
/// # Errors
///
/// Returns an error for unknown lane names.
pub fn lane(name: &str) -> Result<Lane, eyre::Report> {
    Lane::try_from(name).map_err(|err| eyre::eyre!("invalid lane in scenario: {err}"))
}

/// Splits a comma-separated title list used in feature files.
pub fn title_list(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .collect()
}

/// Returns the titles shown in `tasks`, in order.
pub fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(Task::title).collect()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
