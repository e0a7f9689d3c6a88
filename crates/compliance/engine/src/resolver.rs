//! Task eligibility derived from the dependency graph
//!
//! Pure functions over a definition plus an instance. This is the single
//! place dependency gating is computed; the orchestrator enforces it
//! before every transition so callers never have to.

use std::collections::BTreeMap;

use compliance_types::{
    Eligibility, PhaseKey, TaskKey, TaskStatus, WorkflowDefinition, WorkflowError, WorkflowInstance,
    WorkflowResult,
};

/// Derives per-task eligibility and the current phase
#[derive(Clone, Copy, Debug, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Eligibility for every task in the definition.
    ///
    /// A task in progress surfaces as `Eligible`: its gate was already
    /// passed when work started.
    pub fn resolve(
        &self,
        definition: &WorkflowDefinition,
        instance: &WorkflowInstance,
    ) -> BTreeMap<TaskKey, Eligibility> {
        definition
            .tasks()
            .map(|task| {
                let eligibility = match instance.task(&task.key).map(|s| s.status) {
                    Some(TaskStatus::Completed) => Eligibility::Completed,
                    Some(TaskStatus::Rejected) => Eligibility::Rejected,
                    Some(TaskStatus::InProgress) => Eligibility::Eligible,
                    _ => {
                        if self.deps_satisfied(instance, &task.depends_on) {
                            Eligibility::Eligible
                        } else {
                            Eligibility::Locked
                        }
                    }
                };
                (task.key.clone(), eligibility)
            })
            .collect()
    }

    /// The earliest phase containing a task that is neither completed
    /// nor rejected. `None` when every task is closed.
    pub fn current_phase(
        &self,
        definition: &WorkflowDefinition,
        instance: &WorkflowInstance,
    ) -> Option<PhaseKey> {
        definition
            .phases
            .iter()
            .find(|phase| {
                phase.tasks.iter().any(|task| {
                    instance
                        .task(&task.key)
                        .map(|s| !s.is_closed())
                        .unwrap_or(true)
                })
            })
            .map(|phase| phase.key.clone())
    }

    /// Check that a task exists, is still open, and has every dependency
    /// completed. On a locked task the error names the first unmet
    /// dependency in declaration order.
    pub fn ensure_actionable(
        &self,
        definition: &WorkflowDefinition,
        instance: &WorkflowInstance,
        key: &TaskKey,
    ) -> WorkflowResult<()> {
        let (_, task) = definition
            .get_task(key)
            .ok_or_else(|| WorkflowError::TaskNotFound {
                kind: definition.kind,
                task: key.clone(),
            })?;

        if let Some(state) = instance.task(key) {
            if state.is_closed() {
                return Err(WorkflowError::TaskAlreadyClosed {
                    task: key.clone(),
                    status: state.status,
                });
            }
        }

        for dep in &task.depends_on {
            let completed = instance
                .task(dep)
                .map(|s| s.status == TaskStatus::Completed)
                .unwrap_or(false);
            if !completed {
                return Err(WorkflowError::DependencyNotSatisfied {
                    task: key.clone(),
                    unmet: dep.clone(),
                });
            }
        }
        Ok(())
    }

    fn deps_satisfied(&self, instance: &WorkflowInstance, deps: &[TaskKey]) -> bool {
        deps.iter().all(|dep| {
            instance
                .task(dep)
                .map(|s| s.status == TaskStatus::Completed)
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_types::{
        BusinessEntityId, PhaseDefinition, TaskDefinition, TaskOutcome, WorkflowKind,
    };
    use std::collections::HashMap;

    fn definition() -> WorkflowDefinition {
        WorkflowDefinition::new(WorkflowKind::NameChange, "Name Change")
            .with_phase(
                PhaseDefinition::new("approval", "Approval", 1)
                    .with_task(TaskDefinition::new("board_approval", "Approve")),
            )
            .with_phase(
                PhaseDefinition::new("verification", "Verification", 2).with_task(
                    TaskDefinition::new("name_availability", "Check availability")
                        .depends_on("board_approval"),
                ),
            )
            .with_phase(
                PhaseDefinition::new("filing", "Filing", 3).with_task(
                    TaskDefinition::new("state_filing", "File with the state")
                        .depends_on("name_availability"),
                ),
            )
    }

    fn instance() -> WorkflowInstance {
        WorkflowInstance::from_definition(&definition(), BusinessEntityId::new("biz-1"))
    }

    #[test]
    fn test_initial_eligibility() {
        let def = definition();
        let inst = instance();
        let resolver = DependencyResolver::new();
        let map = resolver.resolve(&def, &inst);

        assert_eq!(
            map[&TaskKey::new("board_approval")],
            Eligibility::Eligible
        );
        assert_eq!(map[&TaskKey::new("name_availability")], Eligibility::Locked);
        assert_eq!(map[&TaskKey::new("state_filing")], Eligibility::Locked);
    }

    #[test]
    fn test_completion_unlocks_dependents() {
        let def = definition();
        let mut inst = instance();
        inst.close_task(
            &TaskKey::new("board_approval"),
            TaskOutcome::Completed,
            HashMap::new(),
        );

        let resolver = DependencyResolver::new();
        let map = resolver.resolve(&def, &inst);
        assert_eq!(
            map[&TaskKey::new("name_availability")],
            Eligibility::Eligible
        );
        // Transitive dependents stay locked.
        assert_eq!(map[&TaskKey::new("state_filing")], Eligibility::Locked);
    }

    #[test]
    fn test_rejection_keeps_dependents_locked() {
        let def = definition();
        let mut inst = instance();
        inst.close_task(
            &TaskKey::new("board_approval"),
            TaskOutcome::Completed,
            HashMap::new(),
        );
        inst.close_task(
            &TaskKey::new("name_availability"),
            TaskOutcome::Rejected,
            HashMap::new(),
        );

        let resolver = DependencyResolver::new();
        let map = resolver.resolve(&def, &inst);
        assert_eq!(
            map[&TaskKey::new("name_availability")],
            Eligibility::Rejected
        );
        assert_eq!(map[&TaskKey::new("state_filing")], Eligibility::Locked);
    }

    #[test]
    fn test_in_progress_surfaces_as_eligible() {
        let def = definition();
        let mut inst = instance();
        inst.begin_task(&TaskKey::new("board_approval"));

        let resolver = DependencyResolver::new();
        let map = resolver.resolve(&def, &inst);
        assert_eq!(map[&TaskKey::new("board_approval")], Eligibility::Eligible);
    }

    #[test]
    fn test_current_phase_advances_past_closed_phases() {
        let def = definition();
        let mut inst = instance();
        let resolver = DependencyResolver::new();

        assert_eq!(
            resolver.current_phase(&def, &inst),
            Some(PhaseKey::new("approval"))
        );

        inst.close_task(
            &TaskKey::new("board_approval"),
            TaskOutcome::Completed,
            HashMap::new(),
        );
        assert_eq!(
            resolver.current_phase(&def, &inst),
            Some(PhaseKey::new("verification"))
        );

        // A rejected task closes its phase for current-phase purposes.
        inst.close_task(
            &TaskKey::new("name_availability"),
            TaskOutcome::Rejected,
            HashMap::new(),
        );
        assert_eq!(
            resolver.current_phase(&def, &inst),
            Some(PhaseKey::new("filing"))
        );

        inst.close_task(
            &TaskKey::new("state_filing"),
            TaskOutcome::Completed,
            HashMap::new(),
        );
        assert_eq!(resolver.current_phase(&def, &inst), None);
    }

    #[test]
    fn test_ensure_actionable_names_first_unmet_dependency() {
        let def = definition();
        let inst = instance();
        let resolver = DependencyResolver::new();

        match resolver.ensure_actionable(&def, &inst, &TaskKey::new("state_filing")) {
            Err(WorkflowError::DependencyNotSatisfied { task, unmet }) => {
                assert_eq!(task, TaskKey::new("state_filing"));
                assert_eq!(unmet, TaskKey::new("name_availability"));
            }
            other => panic!("expected DependencyNotSatisfied, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_actionable_unknown_task() {
        let def = definition();
        let inst = instance();
        let resolver = DependencyResolver::new();
        assert!(matches!(
            resolver.ensure_actionable(&def, &inst, &TaskKey::new("missing")),
            Err(WorkflowError::TaskNotFound { .. })
        ));
    }

    #[test]
    fn test_ensure_actionable_rejects_closed_task() {
        let def = definition();
        let mut inst = instance();
        inst.close_task(
            &TaskKey::new("board_approval"),
            TaskOutcome::Completed,
            HashMap::new(),
        );
        let resolver = DependencyResolver::new();
        assert!(matches!(
            resolver.ensure_actionable(&def, &inst, &TaskKey::new("board_approval")),
            Err(WorkflowError::TaskAlreadyClosed { .. })
        ));
    }
}
