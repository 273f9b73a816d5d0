//! Outcome of a retry decision.

use std::time::Duration;

/// What to do with a work item whose execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Return the work item to the queue.
    Retry {
        /// Retry count after the increment.
        retry_count: u32,
        /// Delay before the dispatch should be delivered.
        delay: Duration,
    },
    /// The retry bound is exceeded; the work item fails terminally.
    Exhausted {
        /// Retry count recorded with the failure, one past the bound.
        retry_count: u32,
    },
    /// The failure is not retryable; the work item fails terminally.
    Abandoned {
        /// Unchanged retry count.
        retry_count: u32,
    },
}

impl RetryDecision {
    /// Returns `true` when the work item ends in `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Retry { .. })
    }

    /// Returns the retry count to record.
    #[must_use]
    pub const fn retry_count(self) -> u32 {
        match self {
            Self::Retry { retry_count, .. }
            | Self::Exhausted { retry_count }
            | Self::Abandoned { retry_count } => retry_count,
        }
    }

    /// Returns the canonical label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Retry { .. } => "retry",
            Self::Exhausted { .. } => "exhausted",
            Self::Abandoned { .. } => "abandoned",
        }
    }
}
