//! Closed enumerations shared by messages, events and aggregates.
//!
//! Each vocabulary has a canonical wire spelling, parses
//! case-insensitively, and rejects anything outside the supported set with
//! [`LifecycleDomainError::Unsupported`]. Adding a value is a deliberate,
//! versioned change to this file.

use super::LifecycleDomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $wire:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )+
        }

        impl $name {
            /// Every supported value in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the canonical wire representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl TryFrom<&str> for $name {
            type Error = LifecycleDomainError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                let normalized = value.trim();
                $(
                    if normalized.eq_ignore_ascii_case($wire)
                        $(|| normalized.eq_ignore_ascii_case($alias))*
                    {
                        return Ok(Self::$variant);
                    }
                )+
                Err(LifecycleDomainError::Unsupported {
                    vocabulary: $label,
                    value: value.to_owned(),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::try_from(raw.as_str()).map_err(serde::de::Error::custom)
            }
        }
    };
}

vocabulary!(
    /// Agent type assigned to carry out a work item.
    ExecutionProvider, "execution provider" {
        /// Primary CLI-based code agent.
        ClaudeCode => "ClaudeCode",
        /// Direct API agent without file-system access.
        ClaudeApi => "ClaudeApi",
        /// Alternative model provider.
        OpenAi => "OpenAI",
        /// Alternative model provider.
        Gemini => "Gemini",
        /// Manual completion by a person.
        Human => "Human",
        /// Specialised security audit agent.
        SecurityAgent => "SecurityAgent",
        /// Specialised database migration agent.
        DatabaseAgent => "DatabaseAgent",
        /// Specialised documentation agent.
        DocumentationAgent => "DocumentationAgent",
    }
);

impl ExecutionProvider {
    /// Returns whether work assigned to this provider runs without a person.
    #[must_use]
    pub const fn is_automated(self) -> bool {
        !matches!(self, Self::Human)
    }
}

vocabulary!(
    /// Classification of a detected issue.
    IssueCategory, "issue category" {
        /// Security weakness.
        Security => "Security",
        /// Functional defect.
        Bug => "Bug",
        /// Maintainability concern.
        CodeSmell => "CodeSmell" | "code_smell",
        /// Performance problem.
        Performance => "Performance",
        /// Formatting or style deviation.
        Style => "Style",
    }
);

impl IssueCategory {
    /// Contribution of the category to an issue's impact score.
    #[must_use]
    pub const fn impact_weight(self) -> u32 {
        match self {
            Self::Security => 20,
            Self::Bug | Self::Performance => 10,
            Self::CodeSmell => 2,
            Self::Style => 0,
        }
    }
}

vocabulary!(
    /// Severity assigned by the detection tool.
    Severity, "severity" {
        /// Must be fixed immediately.
        Critical => "Critical",
        /// Should be fixed soon.
        High => "High",
        /// Default severity.
        Medium => "Medium",
        /// Minor.
        Low => "Low",
        /// Informational only.
        Info => "Info",
    }
);

impl Severity {
    /// Contribution of the severity to an issue's impact score.
    #[must_use]
    pub const fn impact_weight(self) -> u32 {
        match self {
            Self::Critical => 50,
            Self::High => 30,
            Self::Medium => 15,
            Self::Low => 5,
            Self::Info => 1,
        }
    }
}

vocabulary!(
    /// Tool or channel that reported an issue.
    DetectionSource, "detection source" {
        /// Static analysis.
        SonarQube => "SonarQube",
        /// Automated code review findings.
        CodeReview => "CodeReview",
        /// Production error tracking.
        GlitchTip => "GlitchTip",
        /// Continuous integration pipeline.
        Cicd => "CICD",
        /// Reported by hand.
        Manual => "Manual",
    }
);

vocabulary!(
    /// Final status reported by an execution agent.
    ExecutionStatus, "execution status" {
        /// Finished successfully.
        Completed => "Completed",
        /// Finished with an error.
        Failed => "Failed",
        /// Stopped on request; always terminal.
        Cancelled => "Cancelled" | "Canceled",
        /// Stopped by an external staleness monitor.
        TimedOut => "TimedOut" | "timed_out",
    }
);

vocabulary!(
    /// What caused a code review to be requested.
    TriggerSource, "trigger source" {
        /// CI check run webhook.
        CheckRun => "check_run",
        /// Commit status webhook.
        Status => "status",
        /// Requested by hand.
        Manual => "manual",
        /// Generic webhook delivery.
        Webhook => "webhook",
    }
);

vocabulary!(
    /// Outcome recommended by a completed code review.
    ReviewRecommendation, "review recommendation" {
        /// Ready to merge.
        Approved => "Approved",
        /// Ready to merge with optional follow-ups.
        ApprovedWithSuggestions => "ApprovedWithSuggestions",
        /// Changes required before merge.
        NeedsWork => "NeedsWork",
    }
);

vocabulary!(
    /// Reason an issue was closed.
    ResolutionReason, "resolution reason" {
        /// A change fixed the finding.
        Fixed => "Fixed",
        /// The finding aged out.
        Stale => "Stale",
        /// The finding was wrong.
        FalsePositive => "FalsePositive",
        /// The finding is accepted as-is.
        WontFix => "WontFix",
    }
);

vocabulary!(
    /// CI system that reported pull request checks.
    ChecksSource, "checks source" {
        /// GitHub Actions.
        GitHubActions => "GitHubActions",
        /// Azure `DevOps` pipelines.
        AzureDevOps => "AzureDevOps",
    }
);

vocabulary!(
    /// Health of a pipeline service.
    HealthStatus, "health status" {
        /// Fully operational.
        Healthy => "Healthy",
        /// Operational with reduced capacity.
        Degraded => "Degraded",
        /// Not operational.
        Unhealthy => "Unhealthy",
    }
);

vocabulary!(
    /// Accounting window of a budget alert.
    BudgetWindow, "budget window" {
        /// One UTC calendar day.
        Daily => "Daily",
        /// One week.
        Weekly => "Weekly",
        /// One calendar month.
        Monthly => "Monthly",
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ClaudeCode", ExecutionProvider::ClaudeCode)]
    #[case("claudecode", ExecutionProvider::ClaudeCode)]
    #[case(" OpenAI ", ExecutionProvider::OpenAi)]
    #[case("DOCUMENTATIONAGENT", ExecutionProvider::DocumentationAgent)]
    fn provider_parses_case_insensitively(
        #[case] raw: &str,
        #[case] expected: ExecutionProvider,
    ) {
        assert_eq!(ExecutionProvider::try_from(raw), Ok(expected));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert_eq!(
            ExecutionProvider::try_from("Copilot"),
            Err(LifecycleDomainError::Unsupported {
                vocabulary: "execution provider",
                value: "Copilot".to_owned(),
            })
        );
    }

    #[test]
    fn only_human_provider_is_manual() {
        let manual: Vec<_> = ExecutionProvider::ALL
            .iter()
            .filter(|provider| !provider.is_automated())
            .collect();
        assert_eq!(manual, vec![&ExecutionProvider::Human]);
    }

    #[test]
    fn vocabulary_serializes_canonical_spelling() {
        let json = serde_json::to_string(&DetectionSource::Cicd).expect("serialize");
        assert_eq!(json, "\"CICD\"");
        let parsed: ExecutionStatus = serde_json::from_str("\"timed_out\"").expect("deserialize");
        assert_eq!(parsed, ExecutionStatus::TimedOut);
    }

    #[test]
    fn unsupported_severity_fails_deserialization() {
        let result = serde_json::from_str::<Severity>("\"Blocker\"");
        assert!(result.is_err());
    }
}
