//! License requirements and the audit ledger that retains history
//!
//! Requirement identifiers are derived from the deduplication key rather
//! than generated randomly, so re-running discovery on the same profile
//! yields identical output. Superseded generations are marked stale, never
//! deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Priority ─────────────────────────────────────────────────────────

/// How urgent a requirement is. Variant order is significant: sorting
/// ascending puts `Critical` first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{}", s)
    }
}

// ── Requirement ──────────────────────────────────────────────────────

/// Identifier for a requirement, derived from its deduplication key
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequirementId(pub String);

impl RequirementId {
    /// Derive a stable identifier from the (category, jurisdiction,
    /// authority) triple. Deterministic by construction.
    pub fn derive(category: &str, jurisdiction: &str, authority: &str) -> Self {
        let slug = |s: &str| {
            s.to_lowercase()
                .chars()
                .map(|c| if c.is_alphanumeric() { c } else { '-' })
                .collect::<String>()
        };
        Self(format!(
            "{}:{}:{}",
            slug(category),
            slug(jurisdiction),
            slug(authority)
        ))
    }
}

impl std::fmt::Display for RequirementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One license or permit a business must hold
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Stable identifier
    pub id: RequirementId,
    /// The license category ("Food Service Permit", ...)
    pub license_category: String,
    /// Urgency tier
    pub priority: Priority,
    /// The authority that issues this license
    pub issuing_authority: String,
    /// The jurisdiction it applies in
    pub jurisdiction: String,
    /// Set when a later discovery run supersedes this requirement
    #[serde(default)]
    pub stale: bool,
}

impl Requirement {
    pub fn new(
        license_category: impl Into<String>,
        priority: Priority,
        issuing_authority: impl Into<String>,
        jurisdiction: impl Into<String>,
    ) -> Self {
        let license_category = license_category.into();
        let issuing_authority = issuing_authority.into();
        let jurisdiction = jurisdiction.into();
        Self {
            id: RequirementId::derive(&license_category, &jurisdiction, &issuing_authority),
            license_category,
            priority,
            issuing_authority,
            jurisdiction,
            stale: false,
        }
    }

    /// The deduplication key: one requirement per (category,
    /// jurisdiction, authority) triple survives discovery.
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.license_category.clone(),
            self.jurisdiction.clone(),
            self.issuing_authority.clone(),
        )
    }
}

// ── Ledger ───────────────────────────────────────────────────────────

/// One recorded discovery run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequirementGeneration {
    /// 1-based generation number
    pub generation: u32,
    /// When this generation was recorded
    pub recorded_at: DateTime<Utc>,
    /// The requirements discovered in this run
    pub requirements: Vec<Requirement>,
}

/// Audit history of requirement generations for one business.
///
/// Recording a new generation marks every requirement in earlier
/// generations stale. Nothing is ever removed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequirementLedger {
    generations: Vec<RequirementGeneration>,
}

impl RequirementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new generation, superseding all earlier ones
    pub fn record(&mut self, requirements: Vec<Requirement>) -> u32 {
        for generation in &mut self.generations {
            for req in &mut generation.requirements {
                req.stale = true;
            }
        }
        let generation = self.generations.len() as u32 + 1;
        self.generations.push(RequirementGeneration {
            generation,
            recorded_at: Utc::now(),
            requirements,
        });
        generation
    }

    /// The requirements from the latest generation
    pub fn current(&self) -> &[Requirement] {
        self.generations
            .last()
            .map(|g| g.requirements.as_slice())
            .unwrap_or(&[])
    }

    /// All generations, oldest first
    pub fn history(&self) -> &[RequirementGeneration] {
        &self.generations
    }

    /// Count of stale requirements across superseded generations
    pub fn stale_count(&self) -> usize {
        self.generations
            .iter()
            .flat_map(|g| g.requirements.iter())
            .filter(|r| r.stale)
            .count()
    }
}
