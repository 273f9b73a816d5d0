//! Pull request state machine tests.

use super::fixtures::{kinds, now, pr_key, work_item_id};
use crate::contract::EventKind;
use crate::lifecycle::domain::{
    ChecksSource, LifecycleDomainError, NewPullRequest, PullRequest, PullRequestCommand,
    PullRequestState, QualityScore, ReviewAttempt, ReviewRecommendation,
};
use rstest::{fixture, rstest};

#[fixture]
fn pull_request() -> PullRequest {
    let (pull_request, events) = PullRequest::open(
        NewPullRequest {
            key: pr_key(17),
            title: "Fix injection".to_owned(),
            head_branch: Some("fix/injection".to_owned()),
            base_branch: Some("main".to_owned()),
            work_item_id: Some(work_item_id(42)),
            execution_id: None,
            created_by: None,
        },
        now(),
    )
    .expect("pull request should open");
    assert_eq!(kinds(&events), vec![EventKind::PullRequestCreated]);
    pull_request
}

fn review() -> PullRequestCommand {
    PullRequestCommand::RecordReview {
        attempt: ReviewAttempt::FIRST,
        recommendation: ReviewRecommendation::NeedsWork,
        quality_score: QualityScore::new(61).expect("score should be valid"),
        findings_count: 3,
        review_blob_path: None,
    }
}

fn merge() -> PullRequestCommand {
    PullRequestCommand::Merge {
        merged_by: Some("bob".to_owned()),
        merge_commit_sha: Some("abc123".to_owned()),
    }
}

fn close() -> PullRequestCommand {
    PullRequestCommand::Close {
        closed_by: None,
        close_reason: Some("superseded".to_owned()),
    }
}

#[rstest]
#[case(PullRequestState::Created, PullRequestState::Reviewed, true)]
#[case(PullRequestState::Created, PullRequestState::Closed, true)]
#[case(PullRequestState::Created, PullRequestState::Merged, false)]
#[case(PullRequestState::Reviewed, PullRequestState::Reviewed, true)]
#[case(PullRequestState::Reviewed, PullRequestState::Merged, true)]
#[case(PullRequestState::Reviewed, PullRequestState::Closed, true)]
#[case(PullRequestState::Merged, PullRequestState::Closed, false)]
#[case(PullRequestState::Merged, PullRequestState::Reviewed, false)]
#[case(PullRequestState::Closed, PullRequestState::Reviewed, false)]
#[case(PullRequestState::Closed, PullRequestState::Merged, false)]
fn can_transition_to_returns_expected(
    #[case] from: PullRequestState,
    #[case] to: PullRequestState,
    #[case] expected: bool,
) {
    assert_eq!(from.can_transition_to(to), expected);
}

#[rstest]
fn merge_requires_a_review(mut pull_request: PullRequest) {
    let result = pull_request.submit(merge(), now());

    assert!(matches!(
        result,
        Err(LifecycleDomainError::InvalidTransition { .. })
    ));
    assert_eq!(pull_request.state(), PullRequestState::Created);
}

#[rstest]
fn reviewed_pull_request_merges(mut pull_request: PullRequest) {
    pull_request
        .submit(review(), now())
        .expect("review should be recorded");

    let transition = pull_request
        .submit(merge(), now())
        .expect("merge should be accepted");

    assert_eq!(transition.state, PullRequestState::Merged);
    assert_eq!(kinds(&transition.events), vec![EventKind::PullRequestMerged]);
    assert_eq!(
        pull_request.latest_review(),
        Some((ReviewAttempt::FIRST, ReviewRecommendation::NeedsWork))
    );
}

#[rstest]
fn checks_are_recorded_without_state_change(mut pull_request: PullRequest) {
    let transition = pull_request
        .submit(
            PullRequestCommand::RecordChecks {
                all_checks_passed: false,
                checks_source: ChecksSource::GitHubActions,
                failed_checks: vec!["clippy".to_owned()],
            },
            now(),
        )
        .expect("checks should be recorded");

    assert_eq!(transition.state, PullRequestState::Created);
    assert_eq!(pull_request.checks_passed(), Some(false));
    assert_eq!(
        kinds(&transition.events),
        vec![EventKind::PullRequestChecksCompleted]
    );
}

#[rstest]
fn closed_pull_request_rejects_checks_and_reviews(mut pull_request: PullRequest) {
    pull_request
        .submit(close(), now())
        .expect("close should be accepted");

    let checks = pull_request.submit(
        PullRequestCommand::RecordChecks {
            all_checks_passed: true,
            checks_source: ChecksSource::AzureDevOps,
            failed_checks: Vec::new(),
        },
        now(),
    );

    assert!(checks.is_err());
    assert!(pull_request.ensure_reviewable().is_err());
    assert!(pull_request.submit(review(), now()).is_err());
}

#[rstest]
fn blank_title_is_rejected() {
    let result = PullRequest::open(
        NewPullRequest {
            key: pr_key(1),
            title: String::new(),
            head_branch: None,
            base_branch: None,
            work_item_id: None,
            execution_id: None,
            created_by: None,
        },
        now(),
    );

    assert!(matches!(result, Err(LifecycleDomainError::EmptyField(_))));
}
