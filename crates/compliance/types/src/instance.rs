//! Workflow instances: one concrete run of a workflow kind
//!
//! A WorkflowInstance tracks per-task state plus a monotonic version used
//! for optimistic concurrency. Instances carry no derived data — eligibility,
//! progress, and alerts are always recomputed from the definition and the
//! raw task states, so they can never drift.

use crate::{TaskKey, WorkflowDefinition, WorkflowKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for a workflow instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the business entity a workflow runs for
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessEntityId(pub String);

impl BusinessEntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for BusinessEntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Task State ───────────────────────────────────────────────────────

/// Stored status of a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Dependencies satisfied, work not yet started
    #[default]
    NotStarted,
    /// Work underway
    InProgress,
    /// Finished successfully
    Completed,
    /// Waiting on unmet dependencies
    Blocked,
    /// Closed unsuccessfully (e.g. a name-availability conflict)
    Rejected,
}

impl TaskStatus {
    /// Closed tasks accept no further transitions
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
            Self::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// Runtime state of one task
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct TaskState {
    /// Current status
    pub status: TaskStatus,
    /// When the task was closed (completed or rejected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Free-form key/value data recorded by callers (chosen filing date,
    /// availability result, discovered requirement counts, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl TaskState {
    /// A task whose dependencies are already satisfied
    pub fn not_started() -> Self {
        Self::default()
    }

    /// A task waiting on unmet dependencies
    pub fn blocked() -> Self {
        Self {
            status: TaskStatus::Blocked,
            ..Self::default()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }
}

/// The outcome a caller reports for a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The task finished successfully
    Completed,
    /// The task closed unsuccessfully; the workflow stays active
    Rejected,
}

// ── Instance State ───────────────────────────────────────────────────

/// Coarse lifecycle state of a workflow instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    /// Accepting task transitions
    #[default]
    Active,
    /// Every task completed
    Completed,
    /// Cancelled by an authorized caller; history retained
    Cancelled,
}

impl InstanceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

// ── Workflow Instance ────────────────────────────────────────────────

/// One concrete run of a workflow kind for one business entity
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Unique instance identifier
    pub id: InstanceId,
    /// The business entity this run belongs to
    pub business_entity_id: BusinessEntityId,
    /// The workflow kind
    pub kind: WorkflowKind,
    /// Coarse lifecycle state
    pub state: InstanceState,
    /// Monotonic version for optimistic concurrency. Every successful
    /// compare-and-swap advances it by exactly one.
    pub version: u64,
    /// Per-task state, keyed by task key
    pub tasks: BTreeMap<TaskKey, TaskState>,
    /// Instance-level context supplied at initiation
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// When the instance was created
    pub created_at: DateTime<Utc>,
    /// When the instance was last updated
    pub updated_at: DateTime<Utc>,
    /// When the instance reached a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowInstance {
    /// Create a fresh instance from a definition. Tasks with no
    /// dependencies start `NotStarted`; the rest start `Blocked`.
    pub fn from_definition(
        definition: &WorkflowDefinition,
        business_entity_id: BusinessEntityId,
    ) -> Self {
        let now = Utc::now();
        let tasks = definition
            .tasks()
            .map(|t| {
                let state = if t.depends_on.is_empty() {
                    TaskState::not_started()
                } else {
                    TaskState::blocked()
                };
                (t.key.clone(), state)
            })
            .collect();

        Self {
            id: InstanceId::generate(),
            business_entity_id,
            kind: definition.kind,
            state: InstanceState::Active,
            version: 0,
            tasks,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    // ── Task transitions ─────────────────────────────────────────────
    //
    // These apply raw state only. Eligibility enforcement lives in the
    // engine's dependency resolver; nothing here checks dependencies.

    /// Mark a task in progress
    pub fn begin_task(&mut self, key: &TaskKey) {
        if let Some(task) = self.tasks.get_mut(key) {
            task.status = TaskStatus::InProgress;
        }
        self.touch();
    }

    /// Close a task with an outcome, merging caller-supplied metadata
    pub fn close_task(
        &mut self,
        key: &TaskKey,
        outcome: TaskOutcome,
        metadata: HashMap<String, String>,
    ) {
        let now = Utc::now();
        if let Some(task) = self.tasks.get_mut(key) {
            task.status = match outcome {
                TaskOutcome::Completed => TaskStatus::Completed,
                TaskOutcome::Rejected => TaskStatus::Rejected,
            };
            task.completed_at = Some(now);
            task.metadata.extend(metadata);
        }
        self.touch();
    }

    /// Mark an open task blocked or unblocked. In-progress and closed
    /// tasks are left alone.
    pub fn set_blocked(&mut self, key: &TaskKey, blocked: bool) {
        if let Some(task) = self.tasks.get_mut(key) {
            match task.status {
                TaskStatus::NotStarted | TaskStatus::Blocked => {
                    task.status = if blocked {
                        TaskStatus::Blocked
                    } else {
                        TaskStatus::NotStarted
                    };
                }
                _ => {}
            }
        }
    }

    /// Complete the instance (all tasks completed)
    pub fn complete(&mut self) {
        self.state = InstanceState::Completed;
        self.completed_at = Some(Utc::now());
        self.touch();
    }

    /// Cancel the instance, retaining all task history
    pub fn cancel(&mut self) {
        self.state = InstanceState::Cancelled;
        self.completed_at = Some(Utc::now());
        self.touch();
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn task(&self, key: &TaskKey) -> Option<&TaskState> {
        self.tasks.get(key)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// True when every task has status `Completed`
    pub fn all_completed(&self) -> bool {
        self.tasks.values().all(|t| t.status == TaskStatus::Completed)
    }

    /// Tasks not yet closed
    pub fn open_tasks(&self) -> impl Iterator<Item = (&TaskKey, &TaskState)> {
        self.tasks.iter().filter(|(_, s)| !s.is_closed())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
