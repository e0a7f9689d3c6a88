//! Error types for the compliance workflow engine
//!
//! Three families, handled differently by callers:
//! definition errors are fatal at load time; invariant violations are
//! caller errors reported synchronously and never retried; concurrency
//! errors are transient and retried a bounded number of times by the
//! orchestrator before escalating.

use crate::{BusinessEntityId, InstanceId, InstanceState, TaskKey, TaskStatus, WorkflowKind};

/// Errors that can occur in workflow operations
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    // ── Definition errors (configuration-time, fatal) ────────────────
    #[error("unknown workflow kind: {0}")]
    UnknownWorkflowKind(WorkflowKind),

    #[error("definition for '{0}' has no tasks")]
    EmptyDefinition(WorkflowKind),

    #[error("definition for '{kind}' declares task '{task}' more than once")]
    DuplicateTask { kind: WorkflowKind, task: TaskKey },

    #[error(
        "definition for '{kind}': task '{task}' depends on '{depends_on}', \
         which does not resolve to a task in the same or an earlier phase"
    )]
    DanglingDependency {
        kind: WorkflowKind,
        task: TaskKey,
        depends_on: TaskKey,
    },

    #[error("definition for '{kind}' has a cyclic task dependency: {cycle}")]
    CyclicDependency { kind: WorkflowKind, cycle: String },

    // ── Invariant violations (caller errors, never auto-retried) ─────
    #[error("task '{task}' is locked: dependency '{unmet}' is not completed")]
    DependencyNotSatisfied { task: TaskKey, unmet: TaskKey },

    #[error("instance '{instance}' is terminal ({state}); no further transitions allowed")]
    InstanceTerminal {
        instance: InstanceId,
        state: InstanceState,
    },

    #[error("an active '{kind}' instance already exists for entity '{entity}'")]
    ActiveInstanceExists {
        entity: BusinessEntityId,
        kind: WorkflowKind,
    },

    #[error("workflow instance not found: {0}")]
    InstanceNotFound(InstanceId),

    #[error("no task '{task}' in the '{kind}' definition")]
    TaskNotFound { kind: WorkflowKind, task: TaskKey },

    #[error("task '{task}' is already closed ({status})")]
    TaskAlreadyClosed { task: TaskKey, status: TaskStatus },

    // ── Concurrency errors ───────────────────────────────────────────
    /// Transient: the stored version advanced past the one the writer
    /// read. Retried internally by the orchestrator.
    #[error("version conflict on instance '{instance}': expected {expected}, found {actual}")]
    VersionConflict {
        instance: InstanceId,
        expected: u64,
        actual: u64,
    },

    /// Surfaced after the bounded retry budget is exhausted.
    #[error("instance '{instance}' was concurrently modified; gave up after {attempts} attempts")]
    ConcurrentModification { instance: InstanceId, attempts: u32 },

    /// A store lock was poisoned by a panicking writer.
    #[error("instance store lock poisoned")]
    StorePoisoned,
}

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
