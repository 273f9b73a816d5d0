//! Tests for failure handling and retry exhaustion.

use super::helpers::{Pipeline, dispatch, pipeline, pipeline_with, result, started, submission};
use foreman::config::CoordinatorConfig;
use foreman::contract::{EventKind, MessageBody};
use foreman::lifecycle::domain::WorkItemStatus;
use foreman::lifecycle::ports::LifecycleRepository;
use foreman::routing::Destination;
use rstest::rstest;

fn three_retries() -> CoordinatorConfig {
    let mut config = CoordinatorConfig::default();
    config.engine.retry.max_retries = 3;
    config
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failures_are_redispatched_until_the_budget_is_spent() {
    let pipeline = pipeline_with(&three_retries());
    pipeline.send(&submission("wi-7-submit", 7)).await;
    pipeline
        .send(&dispatch("wi-7-dispatch", 7, "ClaudeCode"))
        .await;
    let mut execution = pipeline.dispatched_execution(7);
    pipeline.send(&started("wi-7-start-0", 7, execution)).await;

    for attempt in 1..=3_u32 {
        let _kinds = pipeline.drain_kinds();
        pipeline
            .send(&result(
                &format!("wi-7-fail-{attempt}"),
                7,
                execution,
                "Failed",
                true,
            ))
            .await;

        let follow_ups = pipeline.follow_ups();
        let retry = follow_ups.first().expect("a retry dispatch should follow");
        assert_eq!(
            retry.route.destination,
            Destination::Queue("claudecode-work-queue".to_owned())
        );
        assert!(retry.route.delay.is_some());
        match retry.item.as_message().map(|message| message.body()) {
            Some(MessageBody::WorkDispatch(body)) => {
                assert!(body.is_retry);
                assert_eq!(body.retry_count, attempt);
            }
            other => panic!("expected a retry dispatch, got {other:?}"),
        }
        execution = pipeline.dispatched_execution(7);
        pipeline
            .send(&started(&format!("wi-7-start-{attempt}"), 7, execution))
            .await;
    }

    let _kinds = pipeline.drain_kinds();
    pipeline
        .send(&result("wi-7-fail-4", 7, execution, "Failed", true))
        .await;

    assert!(pipeline.follow_ups().is_empty());
    assert_eq!(
        pipeline.drain_kinds(),
        vec![
            EventKind::ExecutionFailed,
            EventKind::WorkItemFailed,
            EventKind::WorkItemStatusChanged,
        ]
    );
    let item = pipeline.work_item(7).await;
    assert_eq!(item.status(), WorkItemStatus::Failed);
    assert_eq!(item.retry_count(), 4);
    let executions = pipeline
        .repository
        .executions_of(item.id())
        .await
        .expect("lookup should succeed");
    assert_eq!(executions.len(), 4);
}

#[rstest]
#[case("Failed", false)]
#[case("Cancelled", true)]
#[tokio::test(flavor = "multi_thread")]
async fn unretryable_failure_fails_at_once(
    pipeline: Pipeline,
    #[case] status: &str,
    #[case] retry_requested: bool,
) {
    pipeline.send(&submission("wi-9-submit", 9)).await;
    pipeline
        .send(&dispatch("wi-9-dispatch", 9, "ClaudeCode"))
        .await;
    let execution = pipeline.dispatched_execution(9);
    pipeline.send(&started("wi-9-start", 9, execution)).await;
    let _kinds = pipeline.drain_kinds();

    pipeline
        .send(&result("wi-9-result", 9, execution, status, retry_requested))
        .await;

    assert!(pipeline.follow_ups().is_empty());
    let item = pipeline.work_item(9).await;
    assert_eq!(item.status(), WorkItemStatus::Failed);
    assert_eq!(item.retry_count(), 0);
}
