//! The declarative rule corpus
//!
//! Each rule pairs a predicate over profile fields with the requirements
//! it implies. Rules are independent — a profile can trigger many — and
//! predicates are pure, so evaluation order never matters.

use crate::{BusinessProfile, Priority, ProfileIssue};
use serde::{Deserialize, Serialize};

// ── Predicates ───────────────────────────────────────────────────────

/// A boolean flag on the profile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFlag {
    HandlesFood,
    ServesMinors,
    SellsAlcohol,
    HasPhysicalLocation,
}

/// A predicate over business profile fields
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RulePredicate {
    /// The NAICS industry code starts with the given prefix
    IndustryPrefix(String),
    /// The profile carries a well-formed NAICS industry code
    Classified,
    /// The profile lists the given activity tag (case-insensitive)
    Activity(String),
    /// One of the profile's boolean flags is set
    Flag(ProfileFlag),
    /// At least this many employees
    MinEmployees(u32),
    /// All sub-predicates hold
    All(Vec<RulePredicate>),
    /// At least one sub-predicate holds
    Any(Vec<RulePredicate>),
}

impl RulePredicate {
    /// Evaluate against a profile.
    ///
    /// Returns `Err` when the predicate needs a field the profile supplies
    /// in a malformed state (e.g. a non-numeric industry code); the caller
    /// records the issue and skips the rule, keeping discovery partial
    /// rather than failing outright.
    pub fn evaluate(&self, profile: &BusinessProfile) -> Result<bool, ProfileIssue> {
        match self {
            Self::IndustryPrefix(prefix) => {
                if !profile.industry_code_valid() {
                    return Err(ProfileIssue {
                        field: "industry_code".into(),
                        value: profile.industry_code.clone(),
                        reason: "expected a 2-6 digit NAICS code".into(),
                    });
                }
                Ok(profile.industry_code.starts_with(prefix.as_str()))
            }
            Self::Classified => {
                if !profile.industry_code_valid() {
                    return Err(ProfileIssue {
                        field: "industry_code".into(),
                        value: profile.industry_code.clone(),
                        reason: "expected a 2-6 digit NAICS code".into(),
                    });
                }
                Ok(true)
            }
            Self::Activity(tag) => Ok(profile
                .activities
                .iter()
                .any(|a| a.trim().eq_ignore_ascii_case(tag))),
            Self::Flag(flag) => Ok(match flag {
                ProfileFlag::HandlesFood => profile.handles_food,
                ProfileFlag::ServesMinors => profile.serves_minors,
                ProfileFlag::SellsAlcohol => profile.sells_alcohol,
                ProfileFlag::HasPhysicalLocation => profile.has_physical_location,
            }),
            Self::MinEmployees(min) => Ok(profile.employee_count >= *min),
            Self::All(preds) => {
                for pred in preds {
                    if !pred.evaluate(profile)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any(preds) => {
                for pred in preds {
                    if pred.evaluate(profile)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

// ── Requirement templates ────────────────────────────────────────────

/// Which jurisdiction(s) a triggered requirement applies in
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JurisdictionScope {
    /// A single named jurisdiction (e.g. a statewide registration)
    Fixed(String),
    /// One requirement per jurisdiction the business operates in
    EachLocation,
}

/// A candidate requirement produced when a rule fires
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementTemplate {
    /// License category
    pub license_category: String,
    /// Urgency tier
    pub priority: Priority,
    /// Issuing authority
    pub issuing_authority: String,
    /// Where the requirement applies
    pub jurisdiction: JurisdictionScope,
}

impl RequirementTemplate {
    pub fn new(
        license_category: impl Into<String>,
        priority: Priority,
        issuing_authority: impl Into<String>,
        jurisdiction: JurisdictionScope,
    ) -> Self {
        Self {
            license_category: license_category.into(),
            priority,
            issuing_authority: issuing_authority.into(),
            jurisdiction,
        }
    }
}

// ── Rules and the corpus ─────────────────────────────────────────────

/// One rule: a predicate mapped to the requirements it implies
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRule {
    /// Stable identifier, useful in regression tests per jurisdiction
    pub rule_id: String,
    /// What this rule captures
    pub description: String,
    /// When the rule fires
    pub predicate: RulePredicate,
    /// What it implies
    pub requirements: Vec<RequirementTemplate>,
}

impl LicenseRule {
    pub fn new(
        rule_id: impl Into<String>,
        description: impl Into<String>,
        predicate: RulePredicate,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            description: description.into(),
            predicate,
            requirements: Vec::new(),
        }
    }

    pub fn with_requirement(mut self, template: RequirementTemplate) -> Self {
        self.requirements.push(template);
        self
    }
}

/// An evaluable collection of license rules
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCorpus {
    rules: Vec<LicenseRule>,
}

impl RuleCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: LicenseRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[LicenseRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule corpus shipped with the product. Content here is data,
    /// not engine logic; jurisdictional nuance lives with legal research.
    pub fn standard() -> Self {
        Self::new()
            .with_rule(
                LicenseRule::new(
                    "food-service",
                    "Food preparation in accommodation/food-service industries",
                    RulePredicate::All(vec![
                        RulePredicate::IndustryPrefix("72".into()),
                        RulePredicate::Flag(ProfileFlag::HandlesFood),
                    ]),
                )
                .with_requirement(RequirementTemplate::new(
                    "Food Service Permit",
                    Priority::Critical,
                    "County Health Department",
                    JurisdictionScope::EachLocation,
                )),
            )
            .with_rule(
                LicenseRule::new(
                    "alcohol-sales",
                    "On- or off-premise alcohol sales",
                    RulePredicate::Flag(ProfileFlag::SellsAlcohol),
                )
                .with_requirement(RequirementTemplate::new(
                    "Liquor License",
                    Priority::Critical,
                    "State Alcoholic Beverage Commission",
                    JurisdictionScope::EachLocation,
                )),
            )
            .with_rule(
                LicenseRule::new(
                    "childcare",
                    "Care or supervision of minors",
                    RulePredicate::All(vec![
                        RulePredicate::Flag(ProfileFlag::ServesMinors),
                        RulePredicate::Any(vec![
                            RulePredicate::Activity("childcare".into()),
                            RulePredicate::IndustryPrefix("6244".into()),
                        ]),
                    ]),
                )
                .with_requirement(RequirementTemplate::new(
                    "Childcare Facility License",
                    Priority::High,
                    "State Department of Human Services",
                    JurisdictionScope::Fixed("Statewide".into()),
                )),
            )
            .with_rule(
                LicenseRule::new(
                    "general-business",
                    "Any classified business, or one with a physical storefront",
                    // The flag checks first so a malformed industry code
                    // never blocks a storefront from triggering the rule.
                    RulePredicate::Any(vec![
                        RulePredicate::Flag(ProfileFlag::HasPhysicalLocation),
                        RulePredicate::Classified,
                    ]),
                )
                .with_requirement(RequirementTemplate::new(
                    "General Business License",
                    Priority::Medium,
                    "City Clerk",
                    JurisdictionScope::EachLocation,
                )),
            )
            .with_rule(
                LicenseRule::new(
                    "sales-tax",
                    "Retail sales of taxable goods",
                    RulePredicate::Activity("retail".into()),
                )
                .with_requirement(RequirementTemplate::new(
                    "Sales Tax Permit",
                    Priority::High,
                    "State Department of Revenue",
                    JurisdictionScope::Fixed("Statewide".into()),
                )),
            )
            .with_rule(
                LicenseRule::new(
                    "employer-registration",
                    "Businesses with employees",
                    RulePredicate::MinEmployees(1),
                )
                .with_requirement(RequirementTemplate::new(
                    "Employer Registration",
                    Priority::High,
                    "State Department of Labor",
                    JurisdictionScope::Fixed("Statewide".into()),
                )),
            )
    }
}
