//! Deadline resolution and alert generation
//!
//! Alerts are derived on every status query from the definition's
//! deadline rules and the instance's task states; nothing here is ever
//! cached. Only actionable severities exist: a deadline outside the
//! configured windows produces no alert at all.

use chrono::{Duration, NaiveDate};
use compliance_types::{
    Alert, AlertSeverity, AlertThresholds, DeadlineRule, TaskDefinition, WorkflowDefinition,
    WorkflowInstance,
};

/// Resolves deadline rules to due dates and classifies urgency
#[derive(Clone, Copy, Debug, Default)]
pub struct DeadlineTracker;

impl DeadlineTracker {
    pub fn new() -> Self {
        Self
    }

    /// Alerts for every open task with a resolvable deadline, most
    /// urgent first.
    ///
    /// Relative rules whose anchor task is incomplete are pending and
    /// produce no alert. Closed tasks never alert.
    pub fn alerts(
        &self,
        definition: &WorkflowDefinition,
        instance: &WorkflowInstance,
        as_of: NaiveDate,
        thresholds: &AlertThresholds,
    ) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = definition
            .tasks()
            .filter(|task| {
                instance
                    .task(&task.key)
                    .map(|s| !s.is_closed())
                    .unwrap_or(false)
            })
            .filter_map(|task| self.alert_for(task, instance, as_of, thresholds))
            .collect();

        alerts.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.days_remaining.cmp(&b.days_remaining))
                .then_with(|| a.task_key.cmp(&b.task_key))
        });
        alerts
    }

    fn alert_for(
        &self,
        task: &TaskDefinition,
        instance: &WorkflowInstance,
        as_of: NaiveDate,
        thresholds: &AlertThresholds,
    ) -> Option<Alert> {
        let due_date = self.resolve_due_date(task.deadline.as_ref()?, instance)?;
        let days_remaining = due_date.signed_duration_since(as_of).num_days();

        let severity = if days_remaining <= thresholds.critical_days
            || (task.is_critical && days_remaining < 0)
        {
            AlertSeverity::Critical
        } else if days_remaining <= thresholds.high_days {
            AlertSeverity::High
        } else {
            return None;
        };

        let message = if days_remaining < 0 {
            format!("'{}' overdue by {} days", task.name, -days_remaining)
        } else {
            format!("'{}' due in {} days", task.name, days_remaining)
        };

        Some(Alert {
            severity,
            task_key: task.key.clone(),
            message,
            due_date,
            days_remaining,
        })
    }

    /// The concrete due date, or `None` while a relative rule's anchor
    /// is still incomplete.
    fn resolve_due_date(
        &self,
        rule: &DeadlineRule,
        instance: &WorkflowInstance,
    ) -> Option<NaiveDate> {
        match rule {
            DeadlineRule::Fixed { due } => Some(*due),
            DeadlineRule::DaysAfter { anchor, days } => {
                let completed_at = instance.task(anchor)?.completed_at?;
                completed_at
                    .date_naive()
                    .checked_add_signed(Duration::days(*days))
            }
        }
    }
}
