//! Workflow definitions: the blueprint for a compliance process
//!
//! A WorkflowDefinition is an ordered list of phases, each holding tasks
//! with explicit dependency edges. Dependencies may reach into earlier
//! phases but never forward — a task cannot wait on work that the process
//! has not reached yet.
//!
//! Definitions are immutable once validated by the registry.

use crate::{WorkflowError, WorkflowResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ── Identifiers ──────────────────────────────────────────────────────

/// The kind of compliance process a definition describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Winding down and closing a business entity
    Dissolution,
    /// Changing the legal name of a business entity
    NameChange,
    /// Discovering license and permit requirements for a business profile
    LicenseDiscovery,
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Dissolution => "dissolution",
            Self::NameChange => "name_change",
            Self::LicenseDiscovery => "license_discovery",
        };
        write!(f, "{}", s)
    }
}

/// Stable identifier for a task within a workflow definition
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskKey(pub String);

impl TaskKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier for a phase within a workflow definition
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhaseKey(pub String);

impl PhaseKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl std::fmt::Display for PhaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Deadline Rules ───────────────────────────────────────────────────

/// How a task's calendar deadline is derived
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadlineRule {
    /// A fixed calendar date
    Fixed {
        /// The date the task is due
        due: NaiveDate,
    },
    /// Due a number of days after another task completes.
    /// While the anchor task is incomplete the deadline is pending.
    DaysAfter {
        /// The task whose completion starts the clock
        anchor: TaskKey,
        /// Days allowed after the anchor completes
        days: i64,
    },
}

impl DeadlineRule {
    /// Create a fixed-date rule
    pub fn fixed(due: NaiveDate) -> Self {
        Self::Fixed { due }
    }

    /// Create a relative rule anchored on another task's completion
    pub fn days_after(anchor: impl Into<String>, days: i64) -> Self {
        Self::DaysAfter {
            anchor: TaskKey::new(anchor),
            days,
        }
    }

    /// The anchor task, if this rule is relative
    pub fn anchor(&self) -> Option<&TaskKey> {
        match self {
            Self::Fixed { .. } => None,
            Self::DaysAfter { anchor, .. } => Some(anchor),
        }
    }
}

// ── Task Definition ──────────────────────────────────────────────────

/// A task — the smallest unit of trackable progress
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Stable key, unique across the whole definition
    pub key: TaskKey,
    /// Human-readable name
    pub name: String,
    /// Tasks that must be completed before this one may start
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskKey>,
    /// Critical tasks escalate alert severity when overdue
    pub is_critical: bool,
    /// Optional deadline rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DeadlineRule>,
}

impl TaskDefinition {
    /// Create a new task definition
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: TaskKey::new(key),
            name: name.into(),
            depends_on: Vec::new(),
            is_critical: false,
            deadline: None,
        }
    }

    /// Add a dependency on another task
    pub fn depends_on(mut self, key: impl Into<String>) -> Self {
        self.depends_on.push(TaskKey::new(key));
        self
    }

    /// Mark this task as critical
    pub fn critical(mut self) -> Self {
        self.is_critical = true;
        self
    }

    /// Attach a deadline rule
    pub fn with_deadline(mut self, rule: DeadlineRule) -> Self {
        self.deadline = Some(rule);
        self
    }
}

// ── Phase Definition ─────────────────────────────────────────────────

/// An ordered grouping of tasks within a workflow
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhaseDefinition {
    /// Stable key
    pub key: PhaseKey,
    /// Human-readable name
    pub name: String,
    /// Display order (phases are walked in ascending order)
    pub order: u32,
    /// The tasks in this phase
    pub tasks: Vec<TaskDefinition>,
}

impl PhaseDefinition {
    /// Create a new phase definition
    pub fn new(key: impl Into<String>, name: impl Into<String>, order: u32) -> Self {
        Self {
            key: PhaseKey::new(key),
            name: name.into(),
            order,
            tasks: Vec::new(),
        }
    }

    /// Add a task to this phase
    pub fn with_task(mut self, task: TaskDefinition) -> Self {
        self.tasks.push(task);
        self
    }

    /// Number of tasks in this phase
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

// ── Workflow Definition ──────────────────────────────────────────────

/// A workflow definition — the blueprint for one compliance process kind
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// The process kind this definition describes
    pub kind: WorkflowKind,
    /// Human-readable name
    pub name: String,
    /// Ordered phases
    pub phases: Vec<PhaseDefinition>,
}

impl WorkflowDefinition {
    /// Create a new workflow definition
    pub fn new(kind: WorkflowKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            phases: Vec::new(),
        }
    }

    /// Add a phase, keeping phases sorted by display order
    pub fn with_phase(mut self, phase: PhaseDefinition) -> Self {
        self.phases.push(phase);
        self.phases.sort_by_key(|p| p.order);
        self
    }

    /// Iterate all tasks across phases in definition order
    pub fn tasks(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.phases.iter().flat_map(|p| p.tasks.iter())
    }

    /// Total number of tasks across all phases
    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|p| p.tasks.len()).sum()
    }

    /// Look up a task and the phase that holds it
    pub fn get_task(&self, key: &TaskKey) -> Option<(&PhaseDefinition, &TaskDefinition)> {
        self.phases.iter().find_map(|phase| {
            phase
                .tasks
                .iter()
                .find(|t| &t.key == key)
                .map(|task| (phase, task))
        })
    }

    /// The index of the phase containing a task
    pub fn phase_index_of(&self, key: &TaskKey) -> Option<usize> {
        self.phases
            .iter()
            .position(|phase| phase.tasks.iter().any(|t| &t.key == key))
    }

    /// Validate the definition for structural correctness.
    ///
    /// Checks, in order: non-emptiness, task key uniqueness, that every
    /// dependency resolves to a task in the same or an earlier phase, and
    /// that the dependency graph is acyclic. Fails fast on the first
    /// problem found — a malformed definition must never be skipped.
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.task_count() == 0 {
            return Err(WorkflowError::EmptyDefinition(self.kind));
        }

        // Task keys must be unique across the whole definition
        let mut seen = HashSet::new();
        for task in self.tasks() {
            if !seen.insert(&task.key) {
                return Err(WorkflowError::DuplicateTask {
                    kind: self.kind,
                    task: task.key.clone(),
                });
            }
        }

        // Every dependency must resolve to a task in the same or an
        // earlier phase. A reference into a later phase is treated the
        // same as a missing one: the process could never satisfy it in
        // order.
        let mut phase_of: HashMap<&TaskKey, usize> = HashMap::new();
        for (idx, phase) in self.phases.iter().enumerate() {
            for task in &phase.tasks {
                phase_of.insert(&task.key, idx);
            }
        }
        for (idx, phase) in self.phases.iter().enumerate() {
            for task in &phase.tasks {
                for dep in &task.depends_on {
                    match phase_of.get(dep) {
                        Some(dep_idx) if *dep_idx <= idx => {}
                        _ => {
                            return Err(WorkflowError::DanglingDependency {
                                kind: self.kind,
                                task: task.key.clone(),
                                depends_on: dep.clone(),
                            });
                        }
                    }
                }
            }
        }

        self.check_acyclic()
    }

    /// Depth-first cycle check over the task dependency graph.
    /// On failure the error names the cycle path.
    fn check_acyclic(&self) -> WorkflowResult<()> {
        let deps: HashMap<&TaskKey, &Vec<TaskKey>> =
            self.tasks().map(|t| (&t.key, &t.depends_on)).collect();

        let mut done: HashSet<&TaskKey> = HashSet::new();
        let mut path: Vec<&TaskKey> = Vec::new();
        let mut on_path: HashSet<&TaskKey> = HashSet::new();

        fn visit<'a>(
            key: &'a TaskKey,
            deps: &HashMap<&'a TaskKey, &'a Vec<TaskKey>>,
            done: &mut HashSet<&'a TaskKey>,
            path: &mut Vec<&'a TaskKey>,
            on_path: &mut HashSet<&'a TaskKey>,
        ) -> Option<Vec<TaskKey>> {
            if done.contains(key) {
                return None;
            }
            if on_path.contains(key) {
                // Slice the current path from the first occurrence of
                // `key` and close the loop for the error message.
                let start = path.iter().position(|k| *k == key).unwrap_or(0);
                let mut cycle: Vec<TaskKey> = path[start..].iter().map(|k| (*k).clone()).collect();
                cycle.push(key.clone());
                return Some(cycle);
            }
            path.push(key);
            on_path.insert(key);
            if let Some(next) = deps.get(key) {
                for dep in next.iter() {
                    if let Some((k, _)) = deps.get_key_value(dep) {
                        if let Some(cycle) = visit(*k, deps, done, path, on_path) {
                            return Some(cycle);
                        }
                    }
                }
            }
            path.pop();
            on_path.remove(key);
            done.insert(key);
            None
        }

        for key in deps.keys().copied().collect::<Vec<_>>() {
            if let Some(cycle) = visit(key, &deps, &mut done, &mut path, &mut on_path) {
                let named = cycle
                    .iter()
                    .map(|k| k.0.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(WorkflowError::CyclicDependency {
                    kind: self.kind,
                    cycle: named,
                });
            }
        }
        Ok(())
    }
}
