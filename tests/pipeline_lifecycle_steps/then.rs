//! Then steps for lifecycle coordination scenarios.

use super::world::{LifecycleWorld, run_async};
use foreman::coordinator::Outcome;
use foreman::lifecycle::domain::{CorrelationKey, WorkItem, WorkItemId};
use foreman::lifecycle::ports::LifecycleRepository;
use rstest_bdd_macros::then;

fn load_work_item(world: &LifecycleWorld, work_item: u64) -> Result<WorkItem, eyre::Report> {
    let id = WorkItemId::new(work_item).map_err(|err| eyre::eyre!("invalid id: {err}"))?;
    run_async(world.repository.find_work_item(id))
        .map_err(|err| eyre::eyre!("work item lookup failed: {err}"))?
        .ok_or_else(|| eyre::eyre!("work item {work_item} does not exist"))
}

#[then(r#"work item {work_item:u64} is "{status}""#)]
fn work_item_status_is(
    world: &LifecycleWorld,
    work_item: u64,
    status: String,
) -> Result<(), eyre::Report> {
    let item = load_work_item(world, work_item)?;
    if item.status().as_str() != status {
        return Err(eyre::eyre!(
            "expected work item {work_item} to be {status}, found {}",
            item.status()
        ));
    }
    Ok(())
}

#[then("work item {work_item:u64} has retry count {count:u32}")]
fn work_item_retry_count_is(
    world: &LifecycleWorld,
    work_item: u64,
    count: u32,
) -> Result<(), eyre::Report> {
    let item = load_work_item(world, work_item)?;
    if item.retry_count() != count {
        return Err(eyre::eyre!(
            "expected retry count {count}, found {}",
            item.retry_count()
        ));
    }
    Ok(())
}

#[then("the last delivery was a duplicate")]
fn last_delivery_was_duplicate(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    match &world.last_outcome {
        Some(Outcome::Duplicate) => Ok(()),
        other => Err(eyre::eyre!("expected a duplicate, got {other:?}")),
    }
}

#[then(r#"issue "{key}" is "{state}""#)]
fn issue_state_is(world: &LifecycleWorld, key: String, state: String) -> Result<(), eyre::Report> {
    let correlation_key =
        CorrelationKey::new(key.as_str()).map_err(|err| eyre::eyre!("invalid key: {err}"))?;
    let issue = run_async(world.repository.find_issue(&correlation_key))
        .map_err(|err| eyre::eyre!("issue lookup failed: {err}"))?
        .ok_or_else(|| eyre::eyre!("issue {key} does not exist"))?;
    if issue.state().as_str() != state {
        return Err(eyre::eyre!(
            "expected issue {key} to be {state}, found {}",
            issue.state()
        ));
    }
    Ok(())
}
