//! Statistics-domain types
//!
//! Subjects and the category metadata they own: the filter hierarchy,
//! the indicator hierarchy, locations, time periods and footnotes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// The logical dataset tied to one uploaded data file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterItem {
    pub id: Uuid,
    /// Durable key within the parent group
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    pub id: Uuid,
    /// Durable key within the parent filter
    pub label: String,
    #[serde(default)]
    pub items: Vec<FilterItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub id: Uuid,
    pub subject_id: Uuid,
    /// Column name in the data file, the durable business key
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub groups: Vec<FilterGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub id: Uuid,
    /// Column name in the data file, the durable business key
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorGroup {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub label: String,
    #[serde(default)]
    pub indicators: Vec<Indicator>,
}

/// Geographic levels a location can be published at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeographicLevel {
    Country,
    EnglishDevolvedArea,
    Institution,
    LocalAuthority,
    LocalAuthorityDistrict,
    LocalEnterprisePartnership,
    LocalSkillsImprovementPlanArea,
    MayoralCombinedAuthority,
    OpportunityArea,
    ParliamentaryConstituency,
    PlanningArea,
    Provider,
    Region,
    RscRegion,
    School,
    Ward,
}

impl GeographicLevel {
    pub fn label(self) -> &'static str {
        match self {
            GeographicLevel::Country => "National",
            GeographicLevel::EnglishDevolvedArea => "English devolved area",
            GeographicLevel::Institution => "Institution",
            GeographicLevel::LocalAuthority => "Local authority",
            GeographicLevel::LocalAuthorityDistrict => "Local authority district",
            GeographicLevel::LocalEnterprisePartnership => "Local enterprise partnership",
            GeographicLevel::LocalSkillsImprovementPlanArea => {
                "Local skills improvement plan area"
            }
            GeographicLevel::MayoralCombinedAuthority => "Mayoral combined authority",
            GeographicLevel::OpportunityArea => "Opportunity area",
            GeographicLevel::ParliamentaryConstituency => "Parliamentary constituency",
            GeographicLevel::PlanningArea => "Planning area",
            GeographicLevel::Provider => "Provider",
            GeographicLevel::Region => "Regional",
            GeographicLevel::RscRegion => "RSC region",
            GeographicLevel::School => "School",
            GeographicLevel::Ward => "Ward",
        }
    }
}

impl fmt::Display for GeographicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Primary identity, stable across data file versions
    pub id: Uuid,
    pub geographic_level: GeographicLevel,
    /// Secondary key, only unique within a geographic level
    pub code: String,
    pub name: String,
}

/// A (year, period code) pair such as `2021 AY`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriod {
    pub year: i32,
    pub code: String,
}

impl TimePeriod {
    pub fn new(year: i32, code: impl Into<String>) -> Self {
        Self {
            year,
            code: code.into(),
        }
    }

    /// Key used by table header cells, e.g. `2021_AY`
    pub fn key(&self) -> String {
        format!("{}_{}", self.year, self.code)
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.year, self.code)
    }
}

/// Narrative annotation with independent join collections.
///
/// Each join is keyed by (footnote id, referenced id), so rewrites delete
/// and re-insert rows rather than updating them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Footnote {
    pub id: Uuid,
    pub release_version_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub subjects: Vec<Uuid>,
    #[serde(default)]
    pub filters: Vec<Uuid>,
    #[serde(default)]
    pub filter_groups: Vec<Uuid>,
    #[serde(default)]
    pub filter_items: Vec<Uuid>,
    #[serde(default)]
    pub indicators: Vec<Uuid>,
}

impl Footnote {
    /// Whether any join references an entity in `ids` or the given subject
    pub fn references_any(&self, subject_id: Uuid, ids: &HashSet<Uuid>) -> bool {
        self.subjects.contains(&subject_id)
            || self
                .filters
                .iter()
                .chain(&self.filter_groups)
                .chain(&self.filter_items)
                .chain(&self.indicators)
                .any(|id| ids.contains(id))
    }
}
