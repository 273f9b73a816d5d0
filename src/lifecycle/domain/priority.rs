//! Work item priority and its configured ordering direction.

use super::LifecycleDomainError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Work item priority value.
///
/// The value carries no direction on its own; [`PriorityOrder`] decides
/// whether lower or higher numbers are dispatched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(i32);

impl Priority {
    /// Creates a priority value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction in which priorities win.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityOrder {
    /// Priority 1 is dispatched before priority 2.
    #[default]
    LowerFirst,
    /// Priority 2 is dispatched before priority 1.
    HigherFirst,
}

impl PriorityOrder {
    /// Compares two priorities so that the winner sorts first.
    #[must_use]
    pub fn compare(self, left: Priority, right: Priority) -> Ordering {
        match self {
            Self::LowerFirst => left.cmp(&right),
            Self::HigherFirst => right.cmp(&left),
        }
    }

    /// Returns the canonical configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LowerFirst => "lower_first",
            Self::HigherFirst => "higher_first",
        }
    }
}

impl TryFrom<&str> for PriorityOrder {
    type Error = LifecycleDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "lower_first" | "ascending" => Ok(Self::LowerFirst),
            "higher_first" | "descending" => Ok(Self::HigherFirst),
            _ => Err(LifecycleDomainError::Unsupported {
                vocabulary: "priority order",
                value: value.to_owned(),
            }),
        }
    }
}
