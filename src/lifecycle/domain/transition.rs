//! Transition results shared by every entity state machine.

use crate::contract::event::EventPayload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity category owning a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Requested unit of work.
    WorkItem,
    /// One execution attempt of a work item.
    TaskExecution,
    /// Pull request produced by an execution.
    PullRequest,
    /// Review attempt of a pull request.
    CodeReview,
    /// Detected finding.
    Issue,
}

impl EntityKind {
    /// Returns the human-readable entity name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorkItem => "work item",
            Self::TaskExecution => "task execution",
            Self::PullRequest => "pull request",
            Self::CodeReview => "code review",
            Self::Issue => "issue",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted transition: the resulting state plus derived event payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    /// State after the transition.
    pub state: S,
    /// Events derived from the transition, in emission order.
    pub events: Vec<EventPayload>,
}

impl<S> Transition<S> {
    /// Creates a transition result.
    #[must_use]
    pub const fn new(state: S, events: Vec<EventPayload>) -> Self {
        Self { state, events }
    }
}
