//! Given steps for task board BDD scenarios.

use super::world::{BoardWorld, lane, run_async, title_list};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use swimlane::board::{
    domain::{Lane, TaskFields},
    ports::RemoteStore,
    services::ReconcilerHandle,
};

#[given(r#"the store holds tasks "{titles}" in lane "{lane_name}""#)]
fn store_holds_tasks(
    world: &mut BoardWorld,
    titles: String,
    lane_name: String,
) -> Result<(), eyre::Report> {
    let lane = lane(&lane_name)?;
    for title in title_list(&titles) {
        run_async(world.store.insert(lane, &TaskFields::new(title)))
            .wrap_err("seed task into store")?;
    }
    Ok(())
}

#[given("the board is synchronised")]
fn board_is_synchronised(world: &mut BoardWorld) -> Result<(), eyre::Report> {
    world.sync = Some(world.board.start().wrap_err("start lane subscriptions")?);
    eyre::ensure!(
        world.sync.as_ref().is_some_and(ReconcilerHandle::is_running),
        "lane subscriptions stopped straight away"
    );
    for lane in Lane::ALL {
        let expected = world.store.snapshot(lane)?.into_tasks();
        world.wait_for_lane(lane, |tasks| *tasks == expected)?;
    }
    Ok(())
}

#[given("the store rejects the next transaction")]
fn store_rejects_next_transaction(world: &mut BoardWorld) -> Result<(), eyre::Report> {
    world
        .store
        .reject_next_transaction("rejected by scenario")
        .wrap_err("queue transaction rejection")
}
