//! License Requirement Discovery
//!
//! Declarative rule corpus evaluated against business profiles to
//! determine which licenses and permits a business must hold.
//!
//! # Key Concepts
//!
//! - **BusinessProfile**: Caller-supplied facts about a business
//!   (industry code, activities, jurisdictions, flags).
//! - **RuleCorpus**: Data, not code — predicates paired with the
//!   requirement templates they imply. Rules are independent and
//!   order-insensitive.
//! - **DiscoveryEngine**: Pure evaluation. Same profile + corpus in,
//!   byte-identical [`DiscoveryReport`] out. Malformed profile fields
//!   skip individual rules and mark the report partial, never abort.
//! - **RequirementLedger**: Append-only history of discovery runs;
//!   superseded generations are marked stale, never deleted.

#![deny(unsafe_code)]

mod engine;
mod profile;
mod requirement;
mod rules;

pub use engine::*;
pub use profile::*;
pub use requirement::*;
pub use rules::*;
