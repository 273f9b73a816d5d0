//! Tests for the detected issue lifecycle.

use super::helpers::{Pipeline, document, issue_report, pipeline};
use foreman::contract::{DeadLetterReason, EventKind};
use foreman::coordinator::Outcome;
use foreman::lifecycle::domain::{CorrelationKey, IssueState, WorkItemStatus};
use foreman::lifecycle::ports::LifecycleRepository;
use foreman::routing::Destination;
use rstest::rstest;
use serde_json::json;

fn promotion(message_id: &str, key: &str, work_item: u64) -> Vec<u8> {
    document(
        message_id,
        None,
        "IssuePromotion",
        json!({
            "correlation_keys": [key],
            "work_item_id": work_item,
            "promotion_rule": "critical-security",
            "work_item_priority": 1,
        }),
    )
}

fn resolution(message_id: &str, key: &str) -> Vec<u8> {
    document(
        message_id,
        None,
        "IssueResolution",
        json!({"correlation_key": key, "resolution_reason": "Fixed"}),
    )
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_detections_update_one_issue(pipeline: Pipeline) {
    pipeline.send(&issue_report("sec-001-a", "sec-001")).await;
    let first = pipeline.publisher.take();
    pipeline.send(&issue_report("sec-001-b", "sec-001")).await;

    let route = &first.first().expect("ingestion should publish").route;
    assert_eq!(route.destination, Destination::Topic("issue-events".to_owned()));
    assert_eq!(route.partition_key, "sec-001");
    assert_eq!(
        pipeline.drain_kinds(),
        vec![EventKind::IssueIngested, EventKind::IssueUpdated]
    );
    let key = CorrelationKey::new("sec-001").expect("key should be valid");
    let issue = pipeline
        .repository
        .find_issue(&key)
        .await
        .expect("lookup should succeed")
        .expect("issue should exist");
    assert_eq!(issue.occurrence_count(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn promotion_creates_the_work_item(pipeline: Pipeline) {
    pipeline.send(&issue_report("sec-002-a", "sec-002")).await;
    pipeline.send(&issue_report("sec-002-b", "sec-002")).await;
    let _kinds = pipeline.drain_kinds();

    pipeline.send(&promotion("sec-002-promote", "sec-002", 99)).await;

    assert_eq!(
        pipeline.drain_kinds(),
        vec![EventKind::WorkItemCreated, EventKind::IssuePromoted]
    );
    let item = pipeline.work_item(99).await;
    assert_eq!(item.status(), WorkItemStatus::Created);
    assert_eq!(item.title(), "Fix 1 Security issue in acme/widgets (src/db.rs)");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resolved_issue_recurs_on_the_same_chain(pipeline: Pipeline) {
    pipeline.send(&issue_report("sec-003-a", "sec-003")).await;
    pipeline.send(&issue_report("sec-003-b", "sec-003")).await;
    pipeline.send(&resolution("sec-003-fix", "sec-003")).await;
    pipeline.send(&issue_report("sec-003-c", "sec-003")).await;

    let events: Vec<_> = pipeline
        .publisher
        .events()
        .into_iter()
        .map(|event| (event.kind(), event.correlation_id().cloned()))
        .collect();

    let kinds: Vec<_> = events.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::IssueIngested,
            EventKind::IssueIngested,
            EventKind::IssueUpdated,
            EventKind::IssueResolved,
            EventKind::IssueRecurred,
        ]
    );
    let first_chain = events.first().and_then(|(_, chain)| chain.clone());
    assert!(first_chain.is_some());
    assert!(events.iter().all(|(_, chain)| *chain == first_chain));
    let key = CorrelationKey::new("sec-003").expect("key should be valid");
    let issue = pipeline
        .repository
        .find_issue(&key)
        .await
        .expect("lookup should succeed")
        .expect("issue should exist");
    assert_eq!(issue.state(), IssueState::Recurred);
    assert_eq!(issue.recurrence_count(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn promotion_before_confirmation_is_dead_lettered(pipeline: Pipeline) {
    pipeline.send(&issue_report("sec-004-a", "sec-004")).await;

    let outcome = pipeline.send(&promotion("sec-004-promote", "sec-004", 98)).await;

    assert_eq!(
        outcome,
        Outcome::DeadLettered {
            reason: DeadLetterReason::InvalidTransition
        }
    );
}
