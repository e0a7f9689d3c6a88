//! Compliance Workflow Engine
//!
//! Orchestrates the compliance lifecycle processes (dissolution, legal
//! name change, license discovery) over the domain types in
//! `compliance-types` and the rule evaluation in `compliance-discovery`.
//!
//! # Architecture
//!
//! - **DefinitionRegistry** / **catalog**: validated, immutable workflow
//!   blueprints, loaded once.
//! - **DependencyResolver**, **CompletionAggregator**,
//!   **DeadlineTracker**: pure derivations over a definition plus an
//!   instance; recomputed per query, never stored.
//! - **InstanceStore**: the only shared mutable state. Versioned
//!   compare-and-swap; no lock held across computation.
//! - **WorkflowOrchestrator**: the sole public facade. Every mutation is
//!   read-validate-write with bounded retry on version conflicts.
//!
//! # Example
//!
//! ```
//! use compliance_engine::WorkflowOrchestrator;
//! use compliance_types::{BusinessEntityId, TaskKey, TaskOutcome, WorkflowKind};
//! use std::collections::HashMap;
//!
//! let orchestrator = WorkflowOrchestrator::builtin()?;
//! let snapshot = orchestrator.initiate(
//!     BusinessEntityId::new("biz-42"),
//!     WorkflowKind::Dissolution,
//!     HashMap::new(),
//! )?;
//!
//! let snapshot = orchestrator.advance(
//!     &snapshot.instance.id,
//!     &TaskKey::new("board_resolution"),
//!     TaskOutcome::Completed,
//!     HashMap::new(),
//! )?;
//! assert!(snapshot.overall_percent() > 0);
//! # Ok::<(), compliance_types::WorkflowError>(())
//! ```

#![deny(unsafe_code)]

mod aggregator;
pub mod catalog;
mod deadlines;
mod orchestrator;
mod registry;
mod resolver;
mod store;

pub use aggregator::*;
pub use deadlines::*;
pub use orchestrator::*;
pub use registry::*;
pub use resolver::*;
pub use store::*;
