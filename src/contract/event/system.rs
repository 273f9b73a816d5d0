//! Operational events published on the system topic.

use super::EventKind;
use crate::envelope::MessageId;
use crate::lifecycle::domain::{BudgetWindow, HealthStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events published on the system topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SystemEvent {
    /// A service changed health.
    HealthStatusChanged {
        /// Reporting service.
        service_name: String,
        /// Health before the change.
        previous_status: HealthStatus,
        /// Health after the change.
        new_status: HealthStatus,
        /// Free-form details.
        details: Option<String>,
    },
    /// A deployment finished.
    DeploymentCompleted {
        /// Deployed service.
        service_name: String,
        /// Deployed version.
        version: String,
        /// Target environment.
        environment: String,
        /// Whether the deployment succeeded.
        success: bool,
        /// Deployment identifier.
        deployment_id: Option<String>,
    },
    /// Queue depth statistics changed.
    QueueStatsChanged {
        /// Queue name.
        queue_name: String,
        /// Messages awaiting delivery.
        active_messages: u64,
        /// Messages in the dead-letter sub-queue.
        dead_letter_messages: u64,
        /// Messages scheduled for later delivery.
        scheduled_messages: u64,
    },
    /// Messages were moved to a dead-letter sink.
    DeadLetterAlert {
        /// Dead-letter queue name.
        queue_name: String,
        /// Dead letters recorded by this process.
        message_count: u64,
        /// Oldest dead-lettered message identity.
        oldest_message_id: Option<MessageId>,
        /// Timestamp of the oldest dead-lettered message.
        oldest_message_timestamp: Option<DateTime<Utc>>,
        /// Reason for the latest dead letter.
        reason: String,
    },
    /// Spending crossed an alert threshold.
    BudgetAlert {
        /// Budget window.
        budget_type: BudgetWindow,
        /// Spend within the window.
        current_spend: Decimal,
        /// Configured limit.
        budget_limit: Decimal,
        /// Spend as a whole percentage of the limit.
        percent_used: u32,
    },
}

impl SystemEvent {
    /// Returns the subject used as partition key.
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::HealthStatusChanged { service_name, .. }
            | Self::DeploymentCompleted { service_name, .. } => service_name,
            Self::QueueStatsChanged { queue_name, .. }
            | Self::DeadLetterAlert { queue_name, .. } => queue_name,
            Self::BudgetAlert { budget_type, .. } => budget_type.as_str(),
        }
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::HealthStatusChanged { .. } => EventKind::HealthStatusChanged,
            Self::DeploymentCompleted { .. } => EventKind::DeploymentCompleted,
            Self::QueueStatsChanged { .. } => EventKind::QueueStatsChanged,
            Self::DeadLetterAlert { .. } => EventKind::DeadLetterAlert,
            Self::BudgetAlert { .. } => EventKind::BudgetAlert,
        }
    }
}
