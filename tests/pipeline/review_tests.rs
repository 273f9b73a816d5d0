//! Tests for the pull request and code review cycle.

use super::helpers::{Pipeline, document, pipeline};
use foreman::contract::{DeadLetterReason, EventKind};
use foreman::coordinator::Outcome;
use foreman::lifecycle::domain::{PullRequestKey, PullRequestState};
use foreman::lifecycle::ports::LifecycleRepository;
use foreman::routing::Destination;
use rstest::rstest;
use serde_json::json;

const PULL_REQUEST: &str = "acme/widgets#17";

fn opened(message_id: &str) -> Vec<u8> {
    document(
        message_id,
        Some("chain-pr-17"),
        "PullRequestOpened",
        json!({"pull_request": PULL_REQUEST, "title": "Fix injection"}),
    )
}

fn review_requested(message_id: &str, pull_request: &str) -> Vec<u8> {
    document(
        message_id,
        None,
        "CodeReviewRequest",
        json!({"pull_request": pull_request, "trigger_source": "webhook"}),
    )
}

fn review_started(message_id: &str) -> Vec<u8> {
    document(
        message_id,
        None,
        "CodeReviewStarted",
        json!({"pull_request": PULL_REQUEST, "attempt": 1}),
    )
}

fn review_completed(message_id: &str) -> Vec<u8> {
    document(
        message_id,
        None,
        "CodeReviewCompleted",
        json!({
            "pull_request": PULL_REQUEST,
            "attempt": 1,
            "quality_score": 92,
            "recommendation": "Approved",
        }),
    )
}

fn merged(message_id: &str) -> Vec<u8> {
    document(
        message_id,
        None,
        "PullRequestClosed",
        json!({
            "pull_request": PULL_REQUEST,
            "merged": true,
            "merge_commit_sha": "abc123",
        }),
    )
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approved_pull_request_is_reviewed_then_merged(pipeline: Pipeline) {
    pipeline.send(&opened("pr-17-open")).await;
    let _kinds = pipeline.drain_kinds();

    pipeline
        .send(&review_requested("pr-17-review", PULL_REQUEST))
        .await;
    let follow_ups = pipeline.follow_ups();
    let request = follow_ups.first().expect("a review request should follow");
    assert_eq!(
        request.route.destination,
        Destination::Queue("codereview-work-queue".to_owned())
    );
    assert_eq!(request.route.partition_key, PULL_REQUEST);
    let _kinds = pipeline.drain_kinds();

    pipeline.send(&review_started("pr-17-review-start")).await;
    let _kinds = pipeline.drain_kinds();
    pipeline.send(&review_completed("pr-17-review-done")).await;
    assert_eq!(
        pipeline.drain_kinds(),
        vec![EventKind::CodeReviewCompleted, EventKind::PullRequestReviewed]
    );

    pipeline.send(&merged("pr-17-merge")).await;
    let published = pipeline.publisher.take();
    let merge = published.first().expect("merge should publish");
    assert_eq!(merge.route.destination, Destination::Topic("pr-events".to_owned()));
    assert_eq!(
        merge.item.as_event().map(|event| event.kind()),
        Some(EventKind::PullRequestMerged)
    );
    assert_eq!(
        merge
            .item
            .correlation_id()
            .map(|id| id.as_str().to_owned()),
        Some("chain-pr-17".to_owned())
    );

    let key = PullRequestKey::try_from(PULL_REQUEST).expect("key should parse");
    let pull_request = pipeline
        .repository
        .find_pull_request(&key)
        .await
        .expect("lookup should succeed")
        .expect("pull request should exist");
    assert_eq!(pull_request.state(), PullRequestState::Merged);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn review_of_unknown_pull_request_is_dead_lettered(pipeline: Pipeline) {
    let outcome = pipeline
        .send(&review_requested("pr-404-review", "acme/widgets#404"))
        .await;

    assert_eq!(
        outcome,
        Outcome::DeadLettered {
            reason: DeadLetterReason::UnknownEntity
        }
    );
    let letters = pipeline.publisher.dead_letters();
    assert_eq!(
        letters
            .first()
            .and_then(|letter| letter.message_id.as_ref())
            .map(|id| id.as_str().to_owned()),
        Some("pr-404-review".to_owned())
    );
}
