//! The built-in workflow catalog
//!
//! Phase and task structure for the three shipped compliance processes.
//! The catalog is data: deadlines here are relative rules anchored on
//! earlier tasks, so no definition ever embeds a calendar date.

use compliance_types::{
    DeadlineRule, PhaseDefinition, TaskDefinition, WorkflowDefinition, WorkflowKind,
};

/// Winding down and closing a business entity
pub fn dissolution() -> WorkflowDefinition {
    WorkflowDefinition::new(WorkflowKind::Dissolution, "Business Dissolution")
        .with_phase(
            PhaseDefinition::new("decision", "Decision", 1).with_task(
                TaskDefinition::new("board_resolution", "Adopt dissolution resolution").critical(),
            ),
        )
        .with_phase(
            PhaseDefinition::new("filing", "State Filing", 2)
                .with_task(
                    TaskDefinition::new("articles_of_dissolution", "File articles of dissolution")
                        .depends_on("board_resolution")
                        .critical()
                        .with_deadline(DeadlineRule::days_after("board_resolution", 90)),
                )
                .with_task(
                    TaskDefinition::new("tax_clearance", "Obtain tax clearance certificate")
                        .depends_on("board_resolution"),
                ),
        )
        .with_phase(
            PhaseDefinition::new("wind_down", "Wind Down", 3)
                .with_task(
                    TaskDefinition::new("notify_creditors", "Notify known creditors")
                        .depends_on("articles_of_dissolution"),
                )
                .with_task(
                    TaskDefinition::new("final_tax_return", "File final tax return")
                        .depends_on("tax_clearance")
                        .critical()
                        .with_deadline(DeadlineRule::days_after("tax_clearance", 75)),
                )
                .with_task(
                    TaskDefinition::new("distribute_assets", "Distribute remaining assets")
                        .depends_on("notify_creditors")
                        .depends_on("tax_clearance"),
                ),
        )
}

/// Changing the legal name of a business entity
pub fn name_change() -> WorkflowDefinition {
    WorkflowDefinition::new(WorkflowKind::NameChange, "Legal Name Change")
        .with_phase(
            PhaseDefinition::new("approval", "Approval", 1)
                .with_task(TaskDefinition::new("board_approval", "Approve new name").critical()),
        )
        .with_phase(
            PhaseDefinition::new("verification", "Name Verification", 2).with_task(
                TaskDefinition::new("name_availability", "Check name availability")
                    .depends_on("board_approval")
                    .with_deadline(DeadlineRule::days_after("board_approval", 30)),
            ),
        )
        .with_phase(
            PhaseDefinition::new("filing", "State Filing", 3).with_task(
                TaskDefinition::new("articles_of_amendment", "File articles of amendment")
                    .depends_on("name_availability")
                    .critical()
                    .with_deadline(DeadlineRule::days_after("board_approval", 45)),
            ),
        )
        .with_phase(
            PhaseDefinition::new("follow_up", "Follow Up", 4)
                .with_task(
                    TaskDefinition::new("irs_notification", "Notify the IRS")
                        .depends_on("articles_of_amendment")
                        .with_deadline(DeadlineRule::days_after("articles_of_amendment", 60)),
                )
                .with_task(
                    TaskDefinition::new("update_licenses", "Update licenses and permits")
                        .depends_on("articles_of_amendment"),
                )
                .with_task(
                    TaskDefinition::new("update_bank_records", "Update bank records")
                        .depends_on("articles_of_amendment"),
                ),
        )
}

/// Discovering license and permit requirements for a business profile
pub fn license_discovery() -> WorkflowDefinition {
    WorkflowDefinition::new(WorkflowKind::LicenseDiscovery, "License Discovery")
        .with_phase(
            PhaseDefinition::new("profile", "Business Profile", 1)
                .with_task(TaskDefinition::new("submit_profile", "Submit business profile")),
        )
        .with_phase(
            PhaseDefinition::new("discovery", "Requirement Discovery", 2).with_task(
                TaskDefinition::new("run_discovery", "Discover license requirements")
                    .depends_on("submit_profile"),
            ),
        )
        .with_phase(
            PhaseDefinition::new("review", "Review", 3).with_task(
                TaskDefinition::new("review_requirements", "Review discovered requirements")
                    .depends_on("run_discovery"),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_types::TaskKey;

    #[test]
    fn test_all_builtin_definitions_validate() {
        assert!(dissolution().validate().is_ok());
        assert!(name_change().validate().is_ok());
        assert!(license_discovery().validate().is_ok());
    }

    #[test]
    fn test_dissolution_shape() {
        let def = dissolution();
        assert_eq!(def.phases.len(), 3);
        assert_eq!(def.task_count(), 6);

        let (phase, task) = def
            .get_task(&TaskKey::new("articles_of_dissolution"))
            .unwrap();
        assert_eq!(phase.key.0, "filing");
        assert!(task.is_critical);
        assert!(task.deadline.is_some());
    }

    #[test]
    fn test_name_change_filing_gated_on_availability() {
        let def = name_change();
        let (_, task) = def.get_task(&TaskKey::new("articles_of_amendment")).unwrap();
        assert_eq!(task.depends_on, vec![TaskKey::new("name_availability")]);
    }

    #[test]
    fn test_license_discovery_is_linear() {
        let def = license_discovery();
        assert_eq!(def.task_count(), 3);
        let (_, task) = def.get_task(&TaskKey::new("run_discovery")).unwrap();
        assert_eq!(task.depends_on, vec![TaskKey::new("submit_profile")]);
    }
}
