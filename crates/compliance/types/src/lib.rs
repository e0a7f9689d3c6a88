//! Compliance Workflow Domain Types
//!
//! Compliance processes (dissolution, legal name change, license
//! discovery) are modeled as **phased task graphs**: an ordered list of
//! phases, each holding tasks with explicit dependency edges that may
//! reach back into earlier phases.
//!
//! # Key Concepts
//!
//! - **WorkflowDefinition**: The immutable blueprint for one process
//!   kind — phases, tasks, dependency edges, deadline rules.
//! - **WorkflowInstance**: One run of a definition for one business
//!   entity, tracking raw task state plus a version for optimistic
//!   concurrency.
//! - **Eligibility / Progress / Alert**: Derived views, recomputed from
//!   canonical state on every query and never stored.
//! - **WorkflowError**: The full error taxonomy — definition errors,
//!   invariant violations, and concurrency conflicts.
//!
//! # Design Principles
//!
//! 1. Task ordering is a first-class dependency graph, validated at load
//!    time and enforced centrally — never scattered across call sites.
//! 2. Derived data is never persisted, so it can never drift.
//! 3. All mutation flows through compare-and-swap on the instance
//!    version. No lost updates, no locks held across computation.

#![deny(unsafe_code)]

mod definition;
mod errors;
mod instance;
mod status;

pub use definition::*;
pub use errors::*;
pub use instance::*;
pub use status::*;
