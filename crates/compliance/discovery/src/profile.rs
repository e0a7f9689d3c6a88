//! Business profiles: the facts discovery rules are evaluated against
//!
//! A profile is caller-supplied and may be partially malformed. Structural
//! problems are reported per-field as [`ProfileIssue`]s; they never abort
//! discovery, they only mark the result as partial.

use serde::{Deserialize, Serialize};

/// A description of a business used for license requirement discovery
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    /// NAICS industry code (2–6 digits)
    pub industry_code: String,
    /// Free-form activity tags ("retail", "childcare", ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<String>,
    /// Jurisdictions the business operates in (city/county names)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jurisdictions: Vec<String>,
    /// Prepares or serves food
    #[serde(default)]
    pub handles_food: bool,
    /// Serves or cares for minors
    #[serde(default)]
    pub serves_minors: bool,
    /// Sells alcoholic beverages
    #[serde(default)]
    pub sells_alcohol: bool,
    /// Operates a physical location open to the public
    #[serde(default)]
    pub has_physical_location: bool,
    /// Number of employees
    #[serde(default)]
    pub employee_count: u32,
}

impl BusinessProfile {
    /// Create a profile with an industry code; everything else defaults off
    pub fn new(industry_code: impl Into<String>) -> Self {
        Self {
            industry_code: industry_code.into(),
            ..Self::default()
        }
    }

    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        self.activities.push(activity.into());
        self
    }

    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdictions.push(jurisdiction.into());
        self
    }

    pub fn handles_food(mut self) -> Self {
        self.handles_food = true;
        self
    }

    pub fn serves_minors(mut self) -> Self {
        self.serves_minors = true;
        self
    }

    pub fn sells_alcohol(mut self) -> Self {
        self.sells_alcohol = true;
        self
    }

    pub fn has_physical_location(mut self) -> Self {
        self.has_physical_location = true;
        self
    }

    pub fn with_employees(mut self, count: u32) -> Self {
        self.employee_count = count;
        self
    }

    /// Whether the industry code is a well-formed NAICS prefix
    pub fn industry_code_valid(&self) -> bool {
        let len = self.industry_code.len();
        (2..=6).contains(&len) && self.industry_code.chars().all(|c| c.is_ascii_digit())
    }

    /// Jurisdictions with the blank entries filtered out
    pub fn valid_jurisdictions(&self) -> impl Iterator<Item = &str> {
        self.jurisdictions
            .iter()
            .map(|j| j.trim())
            .filter(|j| !j.is_empty())
    }

    /// Structural validation: one issue per malformed field
    pub fn issues(&self) -> Vec<ProfileIssue> {
        let mut issues = Vec::new();
        if !self.industry_code_valid() {
            issues.push(ProfileIssue {
                field: "industry_code".into(),
                value: self.industry_code.clone(),
                reason: "expected a 2-6 digit NAICS code".into(),
            });
        }
        if self.jurisdictions.iter().any(|j| j.trim().is_empty()) {
            issues.push(ProfileIssue {
                field: "jurisdictions".into(),
                value: String::new(),
                reason: "contains a blank jurisdiction name".into(),
            });
        }
        if self.activities.iter().any(|a| a.trim().is_empty()) {
            issues.push(ProfileIssue {
                field: "activities".into(),
                value: String::new(),
                reason: "contains a blank activity tag".into(),
            });
        }
        issues
    }
}

/// A per-field problem found while evaluating a profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileIssue {
    /// The offending field
    pub field: String,
    /// The value as supplied
    pub value: String,
    /// Why it could not be used
    pub reason: String,
}

impl std::fmt::Display for ProfileIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({:?})", self.field, self.reason, self.value)
    }
}
