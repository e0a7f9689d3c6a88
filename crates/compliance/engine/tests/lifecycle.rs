//! End-to-end lifecycle scenarios driven through the orchestrator facade.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use compliance_engine::{DefinitionRegistry, WorkflowOrchestrator};
use compliance_types::{
    AlertSeverity, BusinessEntityId, Eligibility, InstanceState, PhaseDefinition, TaskDefinition,
    TaskKey, TaskOutcome, TaskStatus, WorkflowDefinition, WorkflowError, WorkflowKind,
};

fn advance_ok(
    orch: &WorkflowOrchestrator,
    id: &compliance_types::InstanceId,
    task: &str,
) -> compliance_types::StatusSnapshot {
    orch.advance(id, &TaskKey::new(task), TaskOutcome::Completed, HashMap::new())
        .unwrap()
}

/// The canonical three-task dissolution: one decision task, then two
/// filing tasks, the second gated on the first.
fn three_task_dissolution() -> WorkflowDefinition {
    WorkflowDefinition::new(WorkflowKind::Dissolution, "Dissolution")
        .with_phase(
            PhaseDefinition::new("decision", "Decision", 1)
                .with_task(TaskDefinition::new("board_resolution", "Adopt resolution")),
        )
        .with_phase(
            PhaseDefinition::new("filing", "Filing", 2)
                .with_task(
                    TaskDefinition::new("state_filing", "File with the state")
                        .depends_on("board_resolution"),
                )
                .with_task(
                    TaskDefinition::new("tax_clearance", "Obtain tax clearance")
                        .depends_on("state_filing"),
                ),
        )
}

#[test]
fn dissolution_progress_moves_0_33_67_100() {
    let mut registry = DefinitionRegistry::new();
    registry.register(three_task_dissolution()).unwrap();
    let orch = WorkflowOrchestrator::new(registry);

    let snap = orch
        .initiate(
            BusinessEntityId::new("biz-1"),
            WorkflowKind::Dissolution,
            HashMap::new(),
        )
        .unwrap();
    let id = snap.instance.id.clone();
    assert_eq!(snap.overall_percent(), 0);

    let snap = advance_ok(&orch, &id, "board_resolution");
    assert_eq!(snap.overall_percent(), 33);
    assert_eq!(
        snap.eligibility_of(&TaskKey::new("state_filing")),
        Some(Eligibility::Eligible)
    );

    let snap = advance_ok(&orch, &id, "state_filing");
    assert_eq!(snap.overall_percent(), 67);

    let snap = advance_ok(&orch, &id, "tax_clearance");
    assert_eq!(snap.overall_percent(), 100);
    assert_eq!(snap.instance.state, InstanceState::Completed);
}

#[test]
fn reordered_completion_is_rejected() {
    let mut registry = DefinitionRegistry::new();
    registry.register(three_task_dissolution()).unwrap();
    let orch = WorkflowOrchestrator::new(registry);

    let snap = orch
        .initiate(
            BusinessEntityId::new("biz-1"),
            WorkflowKind::Dissolution,
            HashMap::new(),
        )
        .unwrap();
    let id = snap.instance.id.clone();
    advance_ok(&orch, &id, "board_resolution");

    // The second filing task cannot close before the first.
    match orch.advance(
        &id,
        &TaskKey::new("tax_clearance"),
        TaskOutcome::Completed,
        HashMap::new(),
    ) {
        Err(WorkflowError::DependencyNotSatisfied { task, unmet }) => {
            assert_eq!(task, TaskKey::new("tax_clearance"));
            assert_eq!(unmet, TaskKey::new("state_filing"));
        }
        other => panic!("expected DependencyNotSatisfied, got {:?}", other),
    }

    // Nothing was persisted by the failed call.
    let status = orch.get_status(&id).unwrap();
    assert_eq!(status.overall_percent(), 33);
    assert_eq!(status.instance.version, 1);
}

#[test]
fn name_availability_conflict_leaves_instance_active_with_high_alert() {
    let orch = WorkflowOrchestrator::builtin().unwrap();
    let snap = orch
        .initiate(
            BusinessEntityId::new("biz-1"),
            WorkflowKind::NameChange,
            HashMap::new(),
        )
        .unwrap();
    let id = snap.instance.id.clone();

    let snap = advance_ok(&orch, &id, "board_approval");
    let approval_date = snap
        .instance
        .task(&TaskKey::new("board_approval"))
        .unwrap()
        .completed_at
        .unwrap()
        .date_naive();

    let mut conflict = HashMap::new();
    conflict.insert("conflict".to_string(), "true".to_string());
    let snap = orch
        .advance(
            &id,
            &TaskKey::new("name_availability"),
            TaskOutcome::Rejected,
            conflict,
        )
        .unwrap();

    // The rejection closes the task but the workflow stays active and the
    // filing remains locked behind it.
    assert_eq!(snap.instance.state, InstanceState::Active);
    assert_eq!(
        snap.instance
            .task(&TaskKey::new("name_availability"))
            .unwrap()
            .status,
        TaskStatus::Rejected
    );
    assert_eq!(
        snap.eligibility_of(&TaskKey::new("articles_of_amendment")),
        Some(Eligibility::Locked)
    );

    // The filing deadline (45 days after approval) keeps ticking; within
    // 30 days of it the status surfaces a high alert.
    let status = orch
        .status_at(&id, approval_date + Duration::days(20))
        .unwrap();
    let alert = status
        .alerts
        .iter()
        .find(|a| a.task_key == TaskKey::new("articles_of_amendment"))
        .unwrap();
    assert_eq!(alert.severity, AlertSeverity::High);
    assert_eq!(alert.days_remaining, 25);
}

#[test]
fn concurrent_advances_on_independent_tasks_both_land() {
    // After the board resolution, the shipped dissolution catalog has two
    // independent eligible tasks. Two threads close one each; both must
    // eventually succeed and the final instance must reflect both.
    let orch = Arc::new(WorkflowOrchestrator::builtin().unwrap());
    let snap = orch
        .initiate(
            BusinessEntityId::new("biz-1"),
            WorkflowKind::Dissolution,
            HashMap::new(),
        )
        .unwrap();
    let id = snap.instance.id.clone();
    advance_ok(&orch, &id, "board_resolution");

    let handles: Vec<_> = ["articles_of_dissolution", "tax_clearance"]
        .into_iter()
        .map(|task| {
            let orch = Arc::clone(&orch);
            let id = id.clone();
            std::thread::spawn(move || {
                orch.advance(
                    &id,
                    &TaskKey::new(task),
                    TaskOutcome::Completed,
                    HashMap::new(),
                )
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let status = orch.get_status(&id).unwrap();
    assert_eq!(
        status
            .instance
            .task(&TaskKey::new("articles_of_dissolution"))
            .unwrap()
            .status,
        TaskStatus::Completed
    );
    assert_eq!(
        status
            .instance
            .task(&TaskKey::new("tax_clearance"))
            .unwrap()
            .status,
        TaskStatus::Completed
    );
    // One CAS bump per successful write: resolution + two filings.
    assert_eq!(status.instance.version, 3);
}

#[test]
fn completion_is_monotonic_across_any_valid_order() {
    // Repeatedly walk the shipped dissolution picking an arbitrary
    // eligible task each step; the overall percentage never decreases.
    for seed in 0u64..8 {
        let orch = WorkflowOrchestrator::builtin().unwrap();
        let snap = orch
            .initiate(
                BusinessEntityId::new("biz-1"),
                WorkflowKind::Dissolution,
                HashMap::new(),
            )
            .unwrap();
        let id = snap.instance.id.clone();

        let mut last = snap.overall_percent();
        let mut step = 0usize;
        loop {
            let status = orch.get_status(&id).unwrap();
            let eligible: Vec<TaskKey> = status
                .eligibility
                .iter()
                .filter(|(_, e)| **e == Eligibility::Eligible)
                .map(|(k, _)| k.clone())
                .collect();
            if eligible.is_empty() {
                break;
            }
            let pick = ((seed as usize).wrapping_mul(7).wrapping_add(step * 3)) % eligible.len();
            let snap = orch
                .advance(
                    &id,
                    &eligible[pick],
                    TaskOutcome::Completed,
                    HashMap::new(),
                )
                .unwrap();
            assert!(snap.overall_percent() >= last);
            last = snap.overall_percent();
            step += 1;
        }
        assert_eq!(last, 100);
        assert_eq!(
            orch.get_status(&id).unwrap().instance.state,
            InstanceState::Completed
        );
    }
}

#[test]
fn completed_tasks_always_had_their_dependencies_completed_first() {
    // Post-hoc soundness: after any sequence of successful advances, every
    // completed task's dependencies are completed with earlier-or-equal
    // close timestamps.
    let orch = WorkflowOrchestrator::builtin().unwrap();
    let snap = orch
        .initiate(
            BusinessEntityId::new("biz-1"),
            WorkflowKind::Dissolution,
            HashMap::new(),
        )
        .unwrap();
    let id = snap.instance.id.clone();

    for task in [
        "board_resolution",
        "tax_clearance",
        "articles_of_dissolution",
        "notify_creditors",
        "final_tax_return",
        "distribute_assets",
    ] {
        advance_ok(&orch, &id, task);
    }

    let status = orch.get_status(&id).unwrap();
    let definition = compliance_engine::catalog::dissolution();
    for task in definition.tasks() {
        let state = status.instance.task(&task.key).unwrap();
        assert_eq!(state.status, TaskStatus::Completed);
        for dep in &task.depends_on {
            let dep_state = status.instance.task(dep).unwrap();
            assert_eq!(dep_state.status, TaskStatus::Completed);
            assert!(dep_state.completed_at.unwrap() <= state.completed_at.unwrap());
        }
    }
}

#[test]
fn alert_freshness_shifts_by_one_day() {
    let orch = WorkflowOrchestrator::builtin().unwrap();
    let snap = orch
        .initiate(
            BusinessEntityId::new("biz-1"),
            WorkflowKind::NameChange,
            HashMap::new(),
        )
        .unwrap();
    let id = snap.instance.id.clone();
    let snap = advance_ok(&orch, &id, "board_approval");
    let approval_date = snap
        .instance
        .task(&TaskKey::new("board_approval"))
        .unwrap()
        .completed_at
        .unwrap()
        .date_naive();

    let day_one = orch
        .status_at(&id, approval_date + Duration::days(5))
        .unwrap();
    let day_two = orch
        .status_at(&id, approval_date + Duration::days(6))
        .unwrap();

    let availability = TaskKey::new("name_availability");
    let first = day_one
        .alerts
        .iter()
        .find(|a| a.task_key == availability)
        .unwrap();
    let second = day_two
        .alerts
        .iter()
        .find(|a| a.task_key == availability)
        .unwrap();
    assert_eq!(first.days_remaining - 1, second.days_remaining);
    assert_eq!(first.due_date, second.due_date);
}

#[test]
fn rejected_task_counts_as_closed_for_phase_but_not_progress() {
    let mut registry = DefinitionRegistry::new();
    registry.register(three_task_dissolution()).unwrap();
    let orch = WorkflowOrchestrator::new(registry);
    let snap = orch
        .initiate(
            BusinessEntityId::new("biz-1"),
            WorkflowKind::Dissolution,
            HashMap::new(),
        )
        .unwrap();
    let id = snap.instance.id.clone();

    let snap = orch
        .advance(
            &id,
            &TaskKey::new("board_resolution"),
            TaskOutcome::Rejected,
            HashMap::new(),
        )
        .unwrap();
    assert_eq!(snap.overall_percent(), 0);
    // The decision phase is closed, so the current phase moves on even
    // though its work never completed.
    assert_eq!(snap.current_phase.as_ref().unwrap().0, "filing");
    assert_eq!(snap.instance.state, InstanceState::Active);
}

#[test]
fn snapshot_serializes_for_a_request_layer() {
    let orch = WorkflowOrchestrator::builtin().unwrap();
    let snap = orch
        .initiate(
            BusinessEntityId::new("biz-1"),
            WorkflowKind::Dissolution,
            HashMap::new(),
        )
        .unwrap();

    let json = serde_json::to_string(&snap).unwrap();
    assert!(json.contains("\"eligibility\""));
    assert!(json.contains("\"overall_percent\""));
    let back: compliance_types::StatusSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back.instance.id, snap.instance.id);
    assert_eq!(back.overall_percent(), 0);
}
