//! Retry policy: attempt bound plus exponential backoff with jitter.

use super::RetryDecision;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 5_000;
const DEFAULT_MAX_DELAY_MS: u64 = 1_800_000;
const DEFAULT_MAX_JITTER_MS: u64 = 1_000;

/// Retry bound and backoff shape.
///
/// ```text
/// retry count   delay before jitter (base = 5s)
///      0              5s
///      1             10s
///      2             20s
///     >= max       exhausted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed before the work item fails terminally.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound of the exponential part, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Upper bound of the uniform jitter added to every delay, in milliseconds.
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

const fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

const fn default_max_jitter_ms() -> u64 {
    DEFAULT_MAX_JITTER_MS
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            max_jitter_ms: DEFAULT_MAX_JITTER_MS,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given bound and default backoff shape.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Returns the backoff before retry `current + 1`, without jitter.
    #[must_use]
    pub fn base_delay(&self, current: u32) -> Duration {
        let factor = 1_u64.checked_shl(current).unwrap_or(u64::MAX);
        let millis = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Decides what happens after a failed execution.
    ///
    /// `current` is the retry count stored on the work item before this
    /// failure. Exhaustion is checked first, so a failure past the bound
    /// is terminal regardless of `retryable`.
    pub fn decide<R: Rng>(
        &self,
        current: u32,
        retryable: bool,
        rng: &mut R,
    ) -> RetryDecision {
        let next = current.saturating_add(1);
        if next > self.max_retries {
            return RetryDecision::Exhausted { retry_count: next };
        }
        if !retryable {
            return RetryDecision::Abandoned {
                retry_count: current,
            };
        }
        let jitter = Duration::from_millis(rng.gen_range(0..=self.max_jitter_ms));
        RetryDecision::Retry {
            retry_count: next,
            delay: self.base_delay(current).saturating_add(jitter),
        }
    }
}
