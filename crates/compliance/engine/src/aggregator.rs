//! Completion percentages, always recomputed
//!
//! Overall progress is task-count weighted: a five-task phase moves the
//! number five times as much as a one-task phase. Per-phase percentages
//! are floored; the overall percentage rounds to the nearest integer.
//! Rejected tasks never count as completed.

use compliance_types::{
    PhaseProgress, Progress, TaskStatus, WorkflowDefinition, WorkflowInstance,
};

/// Computes per-phase and overall completion
#[derive(Clone, Copy, Debug, Default)]
pub struct CompletionAggregator;

impl CompletionAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(
        &self,
        definition: &WorkflowDefinition,
        instance: &WorkflowInstance,
    ) -> Progress {
        let mut phases = Vec::with_capacity(definition.phases.len());
        let mut completed_total = 0usize;
        let mut task_total = 0usize;

        for phase in &definition.phases {
            let total = phase.tasks.len();
            if total == 0 {
                continue;
            }
            let completed = phase
                .tasks
                .iter()
                .filter(|task| {
                    instance
                        .task(&task.key)
                        .map(|s| s.status == TaskStatus::Completed)
                        .unwrap_or(false)
                })
                .count();

            completed_total += completed;
            task_total += total;
            phases.push(PhaseProgress {
                phase_key: phase.key.clone(),
                completed,
                total,
                percent: Self::percent(completed, total),
            });
        }

        Progress {
            overall_percent: Self::rounded_percent(completed_total, task_total),
            phases,
        }
    }

    fn percent(completed: usize, total: usize) -> u8 {
        if total == 0 {
            return 0;
        }
        (completed * 100 / total) as u8
    }

    fn rounded_percent(completed: usize, total: usize) -> u8 {
        if total == 0 {
            return 0;
        }
        ((completed * 200 + total) / (2 * total)) as u8
    }
}
