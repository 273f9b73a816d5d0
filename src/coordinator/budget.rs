//! Daily spend tracking with threshold alerts.

use crate::contract::BudgetWindow;
use crate::contract::event::SystemEvent;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

/// Percentages of the daily limit that raise an alert.
pub const BUDGET_THRESHOLDS: [u32; 2] = [80, 100];

/// Accumulates execution costs per UTC day.
///
/// Each threshold alerts at most once per day; the accumulator resets at
/// the first cost recorded on a new day.
#[derive(Debug)]
pub struct BudgetTracker {
    limit: Option<Decimal>,
    day: Mutex<BudgetDay>,
}

#[derive(Debug, Default)]
struct BudgetDay {
    date: Option<NaiveDate>,
    spend: Decimal,
    alerted: BTreeSet<u32>,
}

impl BudgetTracker {
    /// Creates a tracker; `None` or a non-positive limit disables alerts.
    #[must_use]
    pub fn new(limit: Option<Decimal>) -> Self {
        Self {
            limit: limit.filter(|value| value.is_sign_positive() && !value.is_zero()),
            day: Mutex::new(BudgetDay::default()),
        }
    }

    /// Adds a cost incurred at `at` and returns the alerts it triggers.
    #[must_use]
    pub fn record(&self, cost: Decimal, at: DateTime<Utc>) -> Vec<SystemEvent> {
        let Some(limit) = self.limit else {
            return Vec::new();
        };
        let mut day = self.day.lock().unwrap_or_else(PoisonError::into_inner);
        let date = at.date_naive();
        if day.date != Some(date) {
            *day = BudgetDay {
                date: Some(date),
                ..BudgetDay::default()
            };
        }
        day.spend += cost.max(Decimal::ZERO);

        let percent_used = (day.spend * Decimal::ONE_HUNDRED / limit)
            .floor()
            .to_u32()
            .unwrap_or(u32::MAX);
        let mut alerts = Vec::new();
        for threshold in BUDGET_THRESHOLDS {
            if percent_used >= threshold && day.alerted.insert(threshold) {
                alerts.push(SystemEvent::BudgetAlert {
                    budget_type: BudgetWindow::Daily,
                    current_spend: day.spend,
                    budget_limit: limit,
                    percent_used,
                });
            }
        }
        alerts
    }

    /// Returns the spend accumulated on the current day.
    #[must_use]
    pub fn current_spend(&self) -> Decimal {
        self.day
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .spend
    }
}
