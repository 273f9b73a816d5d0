//! Tests for at-least-once delivery handling.

use super::helpers::{Pipeline, dispatch, pipeline, submission};
use foreman::contract::DeadLetterReason;
use foreman::coordinator::Outcome;
use foreman::envelope::MessageId;
use foreman::ledger::IdempotencyLedger;
use rstest::rstest;
use std::sync::Arc;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn redelivered_message_is_applied_once(pipeline: Pipeline) {
    let document = submission("wi-42-submit", 42);

    let first = pipeline.send(&document).await;
    let published = pipeline.publisher.len();
    let second = pipeline.send(&document).await;

    assert!(matches!(first, Outcome::Applied { .. }));
    assert_eq!(second, Outcome::Duplicate);
    assert_eq!(pipeline.publisher.len(), published);
    let id = MessageId::new("wi-42-submit").expect("identity should be valid");
    assert!(
        pipeline
            .ledger
            .contains(&id)
            .await
            .expect("lookup should succeed")
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_redeliveries_apply_once(pipeline: Pipeline) {
    pipeline.send(&submission("wi-60-submit", 60)).await;
    let document = Arc::new(dispatch("wi-60-dispatch", 60, "ClaudeCode"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = Arc::clone(&pipeline.coordinator);
            let bytes = Arc::clone(&document);
            tokio::spawn(async move { coordinator.handle_raw(&bytes).await })
        })
        .collect();
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(
            handle
                .await
                .expect("task should not panic")
                .expect("delivery should be handled"),
        );
    }

    let applied = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Outcome::Applied { .. }))
        .count();
    let duplicates = outcomes
        .iter()
        .filter(|outcome| **outcome == Outcome::Duplicate)
        .count();
    assert_eq!(applied, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(pipeline.publisher.messages().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_content_under_a_new_identity_is_a_new_message(pipeline: Pipeline) {
    pipeline.send(&submission("wi-61-first", 61)).await;

    let outcome = pipeline.send(&submission("wi-61-second", 61)).await;

    assert_eq!(
        outcome,
        Outcome::DeadLettered {
            reason: DeadLetterReason::InvalidTransition
        }
    );
    assert_eq!(pipeline.publisher.dead_letters().len(), 1);
    assert_eq!(pipeline.coordinator.dead_letter_count(), 1);
}
