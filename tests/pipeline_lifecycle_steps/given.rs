//! Given steps for lifecycle coordination scenarios.

use super::world::{LifecycleWorld, document, execution_started};
use rstest_bdd_macros::given;
use serde_json::json;

#[given("the retry limit is {limit:u32}")]
fn retry_limit(world: &mut LifecycleWorld, limit: u32) {
    world.config.engine.retry.max_retries = limit;
}

#[given("work item {work_item:u64} has been submitted")]
fn work_item_submitted(world: &mut LifecycleWorld, work_item: u64) -> Result<(), eyre::Report> {
    let message_id = world.next_message_id("submit");
    world.deliver(document(
        &message_id,
        "WorkItemSubmission",
        json!({
            "work_item_id": work_item,
            "title": format!("Work item {work_item}"),
            "priority": 2,
        }),
    )?)?;
    Ok(())
}

#[given(r#"work item {work_item:u64} has been dispatched to "{provider}""#)]
fn work_item_dispatched(
    world: &mut LifecycleWorld,
    work_item: u64,
    provider: String,
) -> Result<(), eyre::Report> {
    let message_id = world.next_message_id("dispatch");
    world.deliver(document(
        &message_id,
        "WorkDispatch",
        json!({"work_item_id": work_item, "execution_provider": provider}),
    )?)?;
    Ok(())
}

#[given("the execution of work item {work_item:u64} has started")]
fn execution_has_started(world: &mut LifecycleWorld, work_item: u64) -> Result<(), eyre::Report> {
    let execution = world.dispatched_execution(work_item)?;
    let message_id = world.next_message_id("start");
    world.deliver(execution_started(&message_id, work_item, execution)?)?;
    Ok(())
}

#[given(r#"issue "{key}" has been reported twice"#)]
fn issue_reported_twice(world: &mut LifecycleWorld, key: String) -> Result<(), eyre::Report> {
    for _ in 0..2 {
        let message_id = world.next_message_id("report");
        world.deliver(document(
            &message_id,
            "IssueReport",
            json!({
                "detection_source": "SonarQube",
                "repository": "acme/widgets",
                "category": "Security",
                "severity": "Critical",
                "rule_id": "S2068",
                "file_path": "src/db.rs",
                "correlation_key": key,
            }),
        )?)?;
    }
    Ok(())
}
