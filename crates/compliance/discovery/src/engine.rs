//! Rule evaluation over a business profile
//!
//! Evaluation is pure and deterministic: the same profile and corpus
//! always yield byte-identical reports. Rules that cannot be evaluated
//! because of malformed profile fields are skipped and reported, never
//! fatal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    BusinessProfile, JurisdictionScope, Priority, ProfileIssue, Requirement, RuleCorpus,
};

/// Fallback jurisdiction for location-scoped requirements when the
/// profile lists no usable jurisdiction.
const UNSPECIFIED_JURISDICTION: &str = "Unspecified";

/// The result of one discovery run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Deduplicated requirements, critical first
    pub requirements: Vec<Requirement>,
    /// Per-field profile problems encountered while evaluating
    pub issues: Vec<ProfileIssue>,
    /// True when at least one rule was skipped due to an issue
    pub partial: bool,
}

impl DiscoveryReport {
    /// Requirements at the given priority tier
    pub fn at_priority(&self, priority: Priority) -> impl Iterator<Item = &Requirement> {
        self.requirements
            .iter()
            .filter(move |r| r.priority == priority)
    }
}

/// Evaluates a rule corpus against a business profile
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscoveryEngine;

impl DiscoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run every rule in the corpus against the profile.
    ///
    /// Each rule is evaluated independently. Requirements are expanded
    /// over the profile's jurisdictions, deduplicated by the (category,
    /// jurisdiction, authority) triple keeping the highest priority, and
    /// sorted critical-first then by jurisdiction and category.
    pub fn discover(&self, profile: &BusinessProfile, corpus: &RuleCorpus) -> DiscoveryReport {
        let mut candidates: BTreeMap<(String, String, String), Requirement> = BTreeMap::new();
        let mut issues = profile.issues();
        let mut skipped = 0usize;

        for rule in corpus.rules() {
            match rule.predicate.evaluate(profile) {
                Ok(false) => {}
                Ok(true) => {
                    debug!(rule_id = %rule.rule_id, "rule fired");
                    for template in &rule.requirements {
                        for jurisdiction in Self::expand_jurisdictions(profile, template) {
                            let req = Requirement::new(
                                template.license_category.clone(),
                                template.priority,
                                template.issuing_authority.clone(),
                                jurisdiction,
                            );
                            let key = req.dedup_key();
                            match candidates.get_mut(&key) {
                                // Keep the more urgent tier on collision.
                                Some(existing) if req.priority < existing.priority => {
                                    existing.priority = req.priority;
                                }
                                Some(_) => {}
                                None => {
                                    candidates.insert(key, req);
                                }
                            }
                        }
                    }
                }
                Err(issue) => {
                    debug!(rule_id = %rule.rule_id, issue = %issue, "rule skipped");
                    skipped += 1;
                    if !issues.contains(&issue) {
                        issues.push(issue);
                    }
                }
            }
        }

        let mut requirements: Vec<Requirement> = candidates.into_values().collect();
        requirements.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.jurisdiction.cmp(&b.jurisdiction))
                .then_with(|| a.license_category.cmp(&b.license_category))
        });

        DiscoveryReport {
            requirements,
            partial: skipped > 0 || !issues.is_empty(),
            issues,
        }
    }

    fn expand_jurisdictions(
        profile: &BusinessProfile,
        template: &crate::RequirementTemplate,
    ) -> Vec<String> {
        match &template.jurisdiction {
            JurisdictionScope::Fixed(name) => vec![name.clone()],
            JurisdictionScope::EachLocation => {
                let locations: Vec<String> =
                    profile.valid_jurisdictions().map(String::from).collect();
                if locations.is_empty() {
                    vec![UNSPECIFIED_JURISDICTION.to_string()]
                } else {
                    locations
                }
            }
        }
    }
}
