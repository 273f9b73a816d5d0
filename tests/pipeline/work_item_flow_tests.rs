//! Tests for the work item happy path.

use super::helpers::{Pipeline, dispatch, document, pipeline, result, started, submission};
use foreman::contract::{DeadLetterReason, EventKind};
use foreman::coordinator::Outcome;
use foreman::lifecycle::domain::{ExecutionState, WorkItemStatus};
use foreman::lifecycle::ports::LifecycleRepository;
use foreman::routing::Destination;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn work_item_runs_from_submission_to_completion(pipeline: Pipeline) {
    assert!(matches!(
        pipeline.send(&submission("wi-42-submit", 42)).await,
        Outcome::Applied { .. }
    ));
    assert_eq!(pipeline.drain_kinds(), vec![EventKind::WorkItemCreated]);

    pipeline
        .send(&dispatch("wi-42-dispatch", 42, "ClaudeCode"))
        .await;
    let execution = pipeline.dispatched_execution(42);
    let follow_ups = pipeline.follow_ups();
    let route = &follow_ups.first().expect("one dispatch follow-up").route;
    assert_eq!(
        route.destination,
        Destination::Queue("claudecode-work-queue".to_owned())
    );
    assert_eq!(route.partition_key, "42");
    assert!(route.delay.is_none());
    assert_eq!(
        pipeline.drain_kinds(),
        vec![EventKind::WorkItemQueued, EventKind::WorkItemStatusChanged]
    );

    pipeline.send(&started("wi-42-start", 42, execution)).await;
    assert_eq!(
        pipeline.drain_kinds(),
        vec![EventKind::ExecutionStarted, EventKind::WorkItemStatusChanged]
    );

    pipeline
        .send(&result("wi-42-result", 42, execution, "Completed", false))
        .await;
    assert_eq!(
        pipeline.drain_kinds(),
        vec![
            EventKind::ExecutionCompleted,
            EventKind::WorkItemCompleted,
            EventKind::WorkItemStatusChanged,
        ]
    );

    let item = pipeline.work_item(42).await;
    assert_eq!(item.status(), WorkItemStatus::Completed);
    assert_eq!(
        item.correlation_id().map(|id| id.as_str().to_owned()),
        Some("chain-42".to_owned())
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn events_follow_the_submitted_correlation(pipeline: Pipeline) {
    pipeline.send(&submission("wi-43-submit", 43)).await;
    pipeline
        .send(&dispatch("wi-43-dispatch", 43, "Gemini"))
        .await;

    let published = pipeline.publisher.snapshot();

    assert!(!published.is_empty());
    assert!(published.iter().all(|item| {
        item.item
            .correlation_id()
            .is_some_and(|id| id.as_str() == "chain-43")
    }));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn queued_work_lists_dispatched_items(pipeline: Pipeline) {
    for id in [51, 52] {
        pipeline
            .send(&submission(&format!("wi-{id}-submit"), id))
            .await;
        pipeline
            .send(&dispatch(&format!("wi-{id}-dispatch"), id, "OpenAI"))
            .await;
    }
    pipeline.send(&submission("wi-53-submit", 53)).await;

    let queued = pipeline
        .coordinator
        .queued_work()
        .await
        .expect("lookup should succeed");

    let mut ids: Vec<u64> = queued.iter().map(|item| item.id().value()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![51, 52]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn independent_work_items_proceed_in_parallel(pipeline: Pipeline) {
    let handles: Vec<_> = (100..110_u64)
        .map(|id| {
            let coordinator = std::sync::Arc::clone(&pipeline.coordinator);
            tokio::spawn(async move {
                let submitted = coordinator
                    .handle_raw(&submission(&format!("par-{id}-submit"), id))
                    .await;
                let dispatched = coordinator
                    .handle_raw(&dispatch(&format!("par-{id}-dispatch"), id, "ClaudeCode"))
                    .await;
                (submitted, dispatched)
            })
        })
        .collect();

    for handle in handles {
        let (submitted, dispatched) = handle.await.expect("task should not panic");
        assert!(matches!(submitted, Ok(Outcome::Applied { .. })));
        assert!(matches!(dispatched, Ok(Outcome::Applied { .. })));
    }
    let queued = pipeline
        .coordinator
        .queued_work()
        .await
        .expect("lookup should succeed");
    assert_eq!(queued.len(), 10);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dispatch_never_reuses_a_supplied_execution_id(pipeline: Pipeline) {
    pipeline.send(&submission("wi-1-submit", 1)).await;
    pipeline.send(&dispatch("wi-1-dispatch", 1, "ClaudeCode")).await;
    let finished = pipeline.dispatched_execution(1);
    pipeline.send(&started("wi-1-start", 1, finished)).await;
    pipeline
        .send(&result("wi-1-result", 1, finished, "Completed", false))
        .await;
    pipeline.send(&submission("wi-2-submit", 2)).await;

    let reused = document(
        "wi-2-dispatch",
        None,
        "WorkDispatch",
        json!({
            "work_item_id": 2,
            "execution_provider": "ClaudeCode",
            "execution_id": finished.value(),
        }),
    );
    assert!(matches!(pipeline.send(&reused).await, Outcome::Applied { .. }));
    let allocated = pipeline.dispatched_execution(2);
    assert_ne!(allocated, finished);

    assert_eq!(
        pipeline.send(&started("wi-2-start-stale", 2, finished)).await,
        Outcome::DeadLettered {
            reason: DeadLetterReason::InvalidTransition
        }
    );
    assert!(matches!(
        pipeline.send(&started("wi-2-start", 2, allocated)).await,
        Outcome::Applied { .. }
    ));

    let history = pipeline
        .repository
        .executions_of(pipeline.work_item(1).await.id())
        .await
        .expect("lookup should succeed");
    assert_eq!(history.len(), 1);
    let kept = history.first().expect("one execution");
    assert_eq!(kept.id(), finished);
    assert_eq!(kept.state(), &ExecutionState::Completed);
}
