//! Issue aggregate: a deduplicated finding and its promotion lifecycle.

use super::{
    CorrelationKey, DetectionSource, EntityKind, IssueCategory, IssueId, LifecycleDomainError,
    Priority, RepositoryName, ResolutionReason, Severity, Transition, WorkItemId,
};
use crate::contract::event::{EventPayload, IssueEvent};
use crate::envelope::CorrelationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const PRODUCTION_ERROR_WEIGHT: u32 = 2;
const PRODUCTION_ERROR_CAP: u32 = 40;
const CRITICAL_PATH_BONUS: u32 = 15;
const REPEAT_OCCURRENCE_WEIGHT: u32 = 2;
const REPEAT_OCCURRENCE_CAP: u32 = 20;
const EXTRA_SOURCE_WEIGHT: u32 = 5;

/// Issue lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueState {
    /// First detection recorded.
    Ingested,
    /// Detected again before promotion or resolution.
    Updated,
    /// Linked to a work item.
    Promoted,
    /// Fixed or dismissed.
    Resolved,
    /// Detected again after resolution.
    Recurred,
}

impl IssueState {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ingested => "Ingested",
            Self::Updated => "Updated",
            Self::Promoted => "Promoted",
            Self::Resolved => "Resolved",
            Self::Recurred => "Recurred",
        }
    }

    /// Returns the state reached when the same finding is detected again.
    #[must_use]
    pub const fn after_detection(self) -> Self {
        match self {
            Self::Ingested | Self::Updated => Self::Updated,
            Self::Promoted => Self::Promoted,
            Self::Resolved | Self::Recurred => Self::Recurred,
        }
    }

    /// Returns `true` when a promotion may be recorded.
    #[must_use]
    pub const fn can_promote(self) -> bool {
        matches!(self, Self::Updated | Self::Recurred)
    }

    /// Returns `true` when a resolution may be recorded.
    #[must_use]
    pub const fn can_resolve(self) -> bool {
        matches!(self, Self::Updated | Self::Promoted | Self::Recurred)
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detection of a finding as reported by a detection tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Deduplication key.
    pub correlation_key: CorrelationKey,
    /// Repository the finding lives in.
    pub repository: RepositoryName,
    /// Detecting tool.
    pub source: DetectionSource,
    /// Category.
    pub category: IssueCategory,
    /// Severity.
    pub severity: Severity,
    /// Analyzer rule identifier.
    pub rule_id: Option<String>,
    /// Affected file.
    pub file_path: Option<String>,
    /// First affected line.
    pub line_number: Option<u32>,
    /// Production errors attributed to the finding.
    pub production_error_count: u32,
    /// Whether the code is on a critical path.
    pub is_in_critical_path: bool,
}

/// Promotion outcome decided outside the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    /// Work item created for the issue or its group.
    pub work_item_id: WorkItemId,
    /// Name of the rule that fired.
    pub promotion_rule: String,
    /// Priority assigned to the work item.
    pub work_item_priority: Priority,
    /// Group shared by issues promoted together.
    pub group_id: Option<String>,
    /// Number of issues in the group.
    pub issues_in_group: u32,
}

/// Recorded resolution of an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resolution reason.
    pub reason: ResolutionReason,
    /// Work item whose change fixed the issue.
    pub fixed_by_work_item_id: Option<WorkItemId>,
    /// Resolution time.
    pub resolved_at: DateTime<Utc>,
}

/// Commands accepted by an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueCommand {
    /// The finding was detected again.
    Detect(Detection),
    /// A promotion rule fired.
    Promote(Promotion),
    /// The finding was fixed or dismissed.
    Resolve {
        /// Resolution reason.
        reason: ResolutionReason,
        /// Work item whose change fixed the issue.
        fixed_by_work_item_id: Option<WorkItemId>,
    },
}

/// Issue aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    id: IssueId,
    correlation_key: CorrelationKey,
    repository: RepositoryName,
    category: IssueCategory,
    severity: Severity,
    rule_id: Option<String>,
    file_path: Option<String>,
    line_number: Option<u32>,
    sources: Vec<DetectionSource>,
    occurrence_count: u32,
    recurrence_count: u32,
    production_error_count: u32,
    is_in_critical_path: bool,
    impact_score: u32,
    state: IssueState,
    promotion: Option<Promotion>,
    resolution: Option<Resolution>,
    correlation_id: Option<CorrelationId>,
    first_seen_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

impl Issue {
    /// Records the first detection of a finding.
    #[must_use]
    pub fn ingest(id: IssueId, detection: Detection, at: DateTime<Utc>) -> (Self, Vec<EventPayload>) {
        let mut issue = Self {
            id,
            correlation_key: detection.correlation_key,
            repository: detection.repository,
            category: detection.category,
            severity: detection.severity,
            rule_id: detection.rule_id,
            file_path: detection.file_path,
            line_number: detection.line_number,
            sources: vec![detection.source],
            occurrence_count: 1,
            recurrence_count: 0,
            production_error_count: detection.production_error_count,
            is_in_critical_path: detection.is_in_critical_path,
            impact_score: 0,
            state: IssueState::Ingested,
            promotion: None,
            resolution: None,
            correlation_id: None,
            first_seen_at: at,
            last_seen_at: at,
        };
        issue.impact_score = issue.compute_impact_score();
        let ingested = issue.ingested_event(detection.source, true);
        (issue, vec![ingested])
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> IssueId {
        self.id
    }

    /// Returns the deduplication key.
    #[must_use]
    pub const fn correlation_key(&self) -> &CorrelationKey {
        &self.correlation_key
    }

    /// Returns the repository.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Returns the category.
    #[must_use]
    pub const fn category(&self) -> IssueCategory {
        self.category
    }

    /// Returns the highest severity seen.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the analyzer rule identifier.
    #[must_use]
    pub fn rule_id(&self) -> Option<&str> {
        self.rule_id.as_deref()
    }

    /// Returns the affected file.
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    /// Returns the most recently reported line.
    #[must_use]
    pub const fn line_number(&self) -> Option<u32> {
        self.line_number
    }

    /// Returns the distinct detecting tools in first-seen order.
    #[must_use]
    pub fn sources(&self) -> &[DetectionSource] {
        &self.sources
    }

    /// Returns the total number of detections.
    #[must_use]
    pub const fn occurrence_count(&self) -> u32 {
        self.occurrence_count
    }

    /// Returns the number of recurrences after resolution.
    #[must_use]
    pub const fn recurrence_count(&self) -> u32 {
        self.recurrence_count
    }

    /// Returns the current impact score.
    #[must_use]
    pub const fn impact_score(&self) -> u32 {
        self.impact_score
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> IssueState {
        self.state
    }

    /// Returns the recorded promotion.
    #[must_use]
    pub const fn promotion(&self) -> Option<&Promotion> {
        self.promotion.as_ref()
    }

    /// Returns the linked work item once promoted.
    #[must_use]
    pub fn work_item_id(&self) -> Option<WorkItemId> {
        self.promotion.as_ref().map(|promotion| promotion.work_item_id)
    }

    /// Returns the latest resolution.
    #[must_use]
    pub const fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    /// Returns the correlation identity of the last applied message.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Returns the first detection time.
    #[must_use]
    pub const fn first_seen_at(&self) -> DateTime<Utc> {
        self.first_seen_at
    }

    /// Returns the latest detection time.
    #[must_use]
    pub const fn last_seen_at(&self) -> DateTime<Utc> {
        self.last_seen_at
    }

    /// Records the correlation identity of the message being applied.
    pub fn correlate(&mut self, correlation_id: CorrelationId) {
        self.correlation_id = Some(correlation_id);
    }

    /// Applies a command and returns the new state with derived events.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidTransition`] for an illegal
    /// edge and [`LifecycleDomainError::AlreadyPromoted`] when the issue
    /// already has a work item.
    pub fn submit(
        &mut self,
        command: IssueCommand,
        at: DateTime<Utc>,
    ) -> Result<Transition<IssueState>, LifecycleDomainError> {
        let events = match command {
            IssueCommand::Detect(detection) => self.detect(detection, at),
            IssueCommand::Promote(promotion) => vec![self.promote(promotion)?],
            IssueCommand::Resolve {
                reason,
                fixed_by_work_item_id,
            } => vec![self.resolve(reason, fixed_by_work_item_id, at)?],
        };
        Ok(Transition::new(self.state, events))
    }

    fn detect(&mut self, detection: Detection, at: DateTime<Utc>) -> Vec<EventPayload> {
        let previous = self.state;
        self.occurrence_count = self.occurrence_count.saturating_add(1);
        if !self.sources.contains(&detection.source) {
            self.sources.push(detection.source);
        }
        self.severity = self.severity.min(detection.severity);
        self.production_error_count = self
            .production_error_count
            .max(detection.production_error_count);
        self.is_in_critical_path |= detection.is_in_critical_path;
        if detection.line_number.is_some() {
            self.line_number = detection.line_number;
        }
        self.last_seen_at = at;
        self.impact_score = self.compute_impact_score();
        self.state = previous.after_detection();

        match previous {
            IssueState::Ingested | IssueState::Updated => vec![
                self.ingested_event(detection.source, false),
                self.updated_event(),
            ],
            IssueState::Promoted | IssueState::Recurred => vec![self.updated_event()],
            IssueState::Resolved => {
                self.recurrence_count = self.recurrence_count.saturating_add(1);
                vec![
                    IssueEvent::Recurred {
                        issue_id: self.id,
                        correlation_key: self.correlation_key.clone(),
                        recurrence_count: self.recurrence_count,
                        last_fixed_at: self
                            .resolution
                            .as_ref()
                            .map(|resolution| resolution.resolved_at),
                    }
                    .into(),
                ]
            }
        }
    }

    fn promote(&mut self, promotion: Promotion) -> Result<EventPayload, LifecycleDomainError> {
        if let Some(existing) = self.work_item_id() {
            return Err(LifecycleDomainError::AlreadyPromoted {
                issue_id: self.id,
                work_item_id: existing,
            });
        }
        if !self.state.can_promote() {
            return Err(self.invalid_transition(IssueState::Promoted));
        }
        let event = IssueEvent::Promoted {
            issue_id: self.id,
            correlation_key: self.correlation_key.clone(),
            work_item_id: promotion.work_item_id,
            promotion_rule: promotion.promotion_rule.clone(),
            work_item_priority: promotion.work_item_priority,
            group_id: promotion.group_id.clone(),
            issues_in_group: promotion.issues_in_group,
        };
        self.promotion = Some(promotion);
        self.state = IssueState::Promoted;
        Ok(event.into())
    }

    fn resolve(
        &mut self,
        reason: ResolutionReason,
        fixed_by_work_item_id: Option<WorkItemId>,
        at: DateTime<Utc>,
    ) -> Result<EventPayload, LifecycleDomainError> {
        if !self.state.can_resolve() {
            return Err(self.invalid_transition(IssueState::Resolved));
        }
        let fixed_by = fixed_by_work_item_id.or_else(|| self.work_item_id());
        self.resolution = Some(Resolution {
            reason,
            fixed_by_work_item_id: fixed_by,
            resolved_at: at,
        });
        self.state = IssueState::Resolved;
        Ok(IssueEvent::Resolved {
            issue_id: self.id,
            correlation_key: self.correlation_key.clone(),
            resolution_reason: reason,
            fixed_by_work_item_id: fixed_by,
            resolved_at: at,
        }
        .into())
    }

    fn compute_impact_score(&self) -> u32 {
        let production = self
            .production_error_count
            .saturating_mul(PRODUCTION_ERROR_WEIGHT)
            .min(PRODUCTION_ERROR_CAP);
        let critical = if self.is_in_critical_path {
            CRITICAL_PATH_BONUS
        } else {
            0
        };
        let repeats = self
            .occurrence_count
            .saturating_sub(1)
            .saturating_mul(REPEAT_OCCURRENCE_WEIGHT)
            .min(REPEAT_OCCURRENCE_CAP);
        let extra_sources = u32::try_from(self.sources.len().saturating_sub(1))
            .unwrap_or(u32::MAX)
            .saturating_mul(EXTRA_SOURCE_WEIGHT);
        self.severity
            .impact_weight()
            .saturating_add(self.category.impact_weight())
            .saturating_add(production)
            .saturating_add(critical)
            .saturating_add(repeats)
            .saturating_add(extra_sources)
    }

    fn source_count(&self) -> u32 {
        u32::try_from(self.sources.len()).unwrap_or(u32::MAX)
    }

    fn ingested_event(&self, source: DetectionSource, is_new: bool) -> EventPayload {
        IssueEvent::Ingested {
            issue_id: self.id,
            correlation_key: self.correlation_key.clone(),
            source,
            category: self.category,
            severity: self.severity,
            file_path: self.file_path.clone(),
            impact_score: self.impact_score,
            is_new,
        }
        .into()
    }

    fn updated_event(&self) -> EventPayload {
        IssueEvent::Updated {
            issue_id: self.id,
            correlation_key: self.correlation_key.clone(),
            occurrence_count: self.occurrence_count,
            source_count: self.source_count(),
            impact_score: self.impact_score,
            sources: self.sources.clone(),
        }
        .into()
    }

    fn invalid_transition(&self, target: IssueState) -> LifecycleDomainError {
        LifecycleDomainError::InvalidTransition {
            entity: EntityKind::Issue,
            from: self.state.to_string(),
            to: target.to_string(),
        }
    }
}
