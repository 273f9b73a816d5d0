//! Issue lifecycle events.

use super::EventKind;
use crate::lifecycle::domain::{
    CorrelationKey, DetectionSource, IssueCategory, IssueId, Priority, ResolutionReason, Severity,
    WorkItemId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events published on the issue topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum IssueEvent {
    /// A detection was ingested.
    Ingested {
        /// Issue identifier.
        issue_id: IssueId,
        /// Deduplication key.
        correlation_key: CorrelationKey,
        /// Detecting tool.
        source: DetectionSource,
        /// Category.
        category: IssueCategory,
        /// Severity.
        severity: Severity,
        /// Affected file.
        file_path: Option<String>,
        /// Impact score after the detection.
        impact_score: u32,
        /// Whether the detection created the issue.
        is_new: bool,
    },
    /// Occurrence statistics changed.
    Updated {
        /// Issue identifier.
        issue_id: IssueId,
        /// Deduplication key.
        correlation_key: CorrelationKey,
        /// Total detections.
        occurrence_count: u32,
        /// Distinct detecting tools.
        source_count: u32,
        /// Impact score after the detection.
        impact_score: u32,
        /// Distinct detecting tools, in first-seen order.
        sources: Vec<DetectionSource>,
    },
    /// The issue was promoted into a work item.
    Promoted {
        /// Issue identifier.
        issue_id: IssueId,
        /// Deduplication key.
        correlation_key: CorrelationKey,
        /// Work item created for the issue or its group.
        work_item_id: WorkItemId,
        /// Name of the rule that fired.
        promotion_rule: String,
        /// Priority assigned to the work item.
        work_item_priority: Priority,
        /// Group shared by issues promoted together.
        group_id: Option<String>,
        /// Number of issues in the group.
        issues_in_group: u32,
    },
    /// The issue was resolved.
    Resolved {
        /// Issue identifier.
        issue_id: IssueId,
        /// Deduplication key.
        correlation_key: CorrelationKey,
        /// Resolution reason.
        resolution_reason: ResolutionReason,
        /// Work item whose change fixed the issue.
        fixed_by_work_item_id: Option<WorkItemId>,
        /// Resolution time.
        resolved_at: DateTime<Utc>,
    },
    /// A resolved issue was detected again.
    Recurred {
        /// Issue identifier.
        issue_id: IssueId,
        /// Deduplication key.
        correlation_key: CorrelationKey,
        /// Times the issue has recurred.
        recurrence_count: u32,
        /// When the issue was last resolved.
        last_fixed_at: Option<DateTime<Utc>>,
    },
}

impl IssueEvent {
    /// Returns the deduplication key of the issue.
    #[must_use]
    pub const fn correlation_key(&self) -> &CorrelationKey {
        match self {
            Self::Ingested {
                correlation_key, ..
            }
            | Self::Updated {
                correlation_key, ..
            }
            | Self::Promoted {
                correlation_key, ..
            }
            | Self::Resolved {
                correlation_key, ..
            }
            | Self::Recurred {
                correlation_key, ..
            } => correlation_key,
        }
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Ingested { .. } => EventKind::IssueIngested,
            Self::Updated { .. } => EventKind::IssueUpdated,
            Self::Promoted { .. } => EventKind::IssuePromoted,
            Self::Resolved { .. } => EventKind::IssueResolved,
            Self::Recurred { .. } => EventKind::IssueRecurred,
        }
    }
}
