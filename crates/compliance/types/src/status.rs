//! Derived status views: eligibility, progress, alerts, snapshots
//!
//! Everything in this module is computed fresh from a definition plus an
//! instance on every query. None of it is stored, so it can never disagree
//! with the underlying task states.

use crate::{PhaseKey, TaskKey, WorkflowInstance};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Eligibility ──────────────────────────────────────────────────────

/// Whether a task may be worked on, derived from its dependency set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    /// At least one dependency is not completed
    Locked,
    /// All dependencies completed; work may start or is underway
    Eligible,
    /// Task completed
    Completed,
    /// Task closed unsuccessfully
    Rejected,
}

// ── Progress ─────────────────────────────────────────────────────────

/// Completion breakdown for one phase
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
    /// The phase
    pub phase_key: PhaseKey,
    /// Tasks completed in this phase
    pub completed: usize,
    /// Total tasks in this phase
    pub total: usize,
    /// `completed / total * 100`, floored
    pub percent: u8,
}

/// Aggregate completion for a whole instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Task-count weighted overall percentage, rounded to the nearest
    /// integer
    pub overall_percent: u8,
    /// Per-phase breakdown in definition order (empty phases excluded)
    pub phases: Vec<PhaseProgress>,
}

// ── Alerts ───────────────────────────────────────────────────────────

/// How urgent an alert is. Only actionable severities exist; anything
/// less urgent is simply not surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Due within the critical window, or a critical task overdue
    Critical,
    /// Due within the high window
    High,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// A deadline alert for one open task. Derived on every status query,
/// never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Urgency classification
    pub severity: AlertSeverity,
    /// The task the deadline belongs to
    pub task_key: TaskKey,
    /// Human-readable summary
    pub message: String,
    /// The resolved due date
    pub due_date: NaiveDate,
    /// Whole days until the due date; negative when overdue
    pub days_remaining: i64,
}

/// Day windows used to classify alert severity.
///
/// These are configuration, not constants: different product surfaces tune
/// them differently (e.g. license renewal urgency).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Alerts with this many days (or fewer) remaining are critical
    pub critical_days: i64,
    /// Alerts with this many days (or fewer) remaining are high
    pub high_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            critical_days: 7,
            high_days: 30,
        }
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────

/// The full status view returned by every orchestrator operation:
/// the instance plus all derived views, computed together so they are
/// mutually consistent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// The instance as persisted
    pub instance: WorkflowInstance,
    /// Per-task eligibility
    pub eligibility: BTreeMap<TaskKey, Eligibility>,
    /// The earliest phase with unfinished work, `None` when all closed
    pub current_phase: Option<PhaseKey>,
    /// Completion percentages
    pub progress: Progress,
    /// Actionable deadline alerts, most urgent first
    pub alerts: Vec<Alert>,
}

impl StatusSnapshot {
    /// Convenience accessor for the overall completion percentage
    pub fn overall_percent(&self) -> u8 {
        self.progress.overall_percent
    }

    /// Eligibility of one task
    pub fn eligibility_of(&self, key: &TaskKey) -> Option<Eligibility> {
        self.eligibility.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = AlertThresholds::default();
        assert_eq!(t.critical_days, 7);
        assert_eq!(t.high_days, 30);
    }

    #[test]
    fn test_severity_ordering() {
        // Critical sorts before High so alert lists lead with the most
        // urgent items.
        assert!(AlertSeverity::Critical < AlertSeverity::High);
    }

    #[test]
    fn test_alert_serde() {
        let alert = Alert {
            severity: AlertSeverity::High,
            task_key: TaskKey::new("articles"),
            message: "'File articles' due in 12 days".into(),
            due_date: NaiveDate::from_ymd_opt(2026, 9, 6).unwrap(),
            days_remaining: 12,
        };
        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"high\""));
        let back: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(back, alert);
    }

    #[test]
    fn test_thresholds_serde() {
        let json = r#"{"critical_days": 14, "high_days": 90}"#;
        let t: AlertThresholds = serde_json::from_str(json).unwrap();
        assert_eq!(t.critical_days, 14);
        assert_eq!(t.high_days, 90);
    }
}
