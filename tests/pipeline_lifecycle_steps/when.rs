//! When steps for lifecycle coordination scenarios.

use super::world::{LifecycleWorld, document, execution_result, execution_started};
use rstest_bdd_macros::when;
use serde_json::json;

#[when("the execution of work item {work_item:u64} succeeds")]
fn execution_succeeds(world: &mut LifecycleWorld, work_item: u64) -> Result<(), eyre::Report> {
    let execution = world.dispatched_execution(work_item)?;
    let message_id = world.next_message_id("result");
    world.deliver(execution_result(&message_id, work_item, execution, true)?)?;
    Ok(())
}

#[when("the execution of work item {work_item:u64} fails {times:u32} times")]
fn execution_fails_repeatedly(
    world: &mut LifecycleWorld,
    work_item: u64,
    times: u32,
) -> Result<(), eyre::Report> {
    for attempt in 1..=times {
        let execution = world.dispatched_execution(work_item)?;
        let failure_id = world.next_message_id("failure");
        world.deliver(execution_result(&failure_id, work_item, execution, false)?)?;
        if attempt < times {
            let retried = world.dispatched_execution(work_item)?;
            let start_id = world.next_message_id("restart");
            world.deliver(execution_started(&start_id, work_item, retried)?)?;
        }
    }
    Ok(())
}

#[when("the same message is delivered again")]
fn same_message_again(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    let document = world
        .last_document
        .clone()
        .ok_or_else(|| eyre::eyre!("no message delivered yet"))?;
    world.deliver(document)?;
    Ok(())
}

#[when(r#"issue "{key}" is promoted to work item {work_item:u64}"#)]
fn issue_promoted(
    world: &mut LifecycleWorld,
    key: String,
    work_item: u64,
) -> Result<(), eyre::Report> {
    let message_id = world.next_message_id("promote");
    world.deliver(document(
        &message_id,
        "IssuePromotion",
        json!({
            "correlation_keys": [key],
            "work_item_id": work_item,
            "promotion_rule": "critical-security",
            "work_item_priority": 1,
        }),
    )?)?;
    Ok(())
}
