//! Behaviour tests for end-to-end lifecycle coordination.

#[path = "pipeline_lifecycle_steps/mod.rs"]
mod pipeline_lifecycle_steps_defs;

use pipeline_lifecycle_steps_defs::world::{LifecycleWorld, world};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/pipeline_lifecycle.feature",
    name = "A completed work item ignores a redelivered result"
)]
#[tokio::test(flavor = "multi_thread")]
async fn completed_work_item_ignores_redelivery(world: LifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_lifecycle.feature",
    name = "A failing work item exhausts its retries"
)]
#[tokio::test(flavor = "multi_thread")]
async fn failing_work_item_exhausts_retries(world: LifecycleWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pipeline_lifecycle.feature",
    name = "A confirmed issue is promoted to a work item"
)]
#[tokio::test(flavor = "multi_thread")]
async fn confirmed_issue_is_promoted(world: LifecycleWorld) {
    let _ = world;
}
