//! Replacement Plan
//!
//! The immutable result of matching every reference to an original subject
//! against a replacement subject. Every leaf carries a nullable `target`
//! (time periods carry `valid`), and every composite level reports whether
//! all of its leaves resolved.

use crate::models::{DataSetVersionStatus, GeographicLevel, MappingStatus};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// One filter item referenced by the original
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterItemReplacement {
    /// Original item id
    pub id: Uuid,
    pub label: String,
    /// Replacement item with the same filter name, group label and item label
    pub target: Option<Uuid>,
    /// True when a target was found
    pub valid: bool,
}

impl FilterItemReplacement {
    pub fn new(id: Uuid, label: impl Into<String>, target: Option<Uuid>) -> Self {
        Self {
            id,
            label: label.into(),
            target,
            valid: target.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroupReplacement {
    pub id: Uuid,
    pub label: String,
    /// Informational only, validity comes from the items
    pub target: Option<Uuid>,
    pub items: Vec<FilterItemReplacement>,
    /// All items resolved
    pub valid: bool,
}

impl FilterGroupReplacement {
    pub fn new(
        id: Uuid,
        label: impl Into<String>,
        target: Option<Uuid>,
        items: Vec<FilterItemReplacement>,
    ) -> Self {
        let valid = items.iter().all(|i| i.valid);
        Self {
            id,
            label: label.into(),
            target,
            items,
            valid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterReplacement {
    pub id: Uuid,
    /// Business key the filter is matched on
    pub name: String,
    pub label: String,
    /// Informational only, validity comes from the groups
    pub target: Option<Uuid>,
    pub groups: Vec<FilterGroupReplacement>,
    pub valid: bool,
}

impl FilterReplacement {
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        label: impl Into<String>,
        target: Option<Uuid>,
        groups: Vec<FilterGroupReplacement>,
    ) -> Self {
        let valid = groups.iter().all(|g| g.valid);
        Self {
            id,
            name: name.into(),
            label: label.into(),
            target,
            groups,
            valid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorReplacement {
    pub id: Uuid,
    /// Business key the indicator is matched on
    pub name: String,
    pub label: String,
    /// Replacement indicator with the same name, in any group
    pub target: Option<Uuid>,
    pub valid: bool,
}

impl IndicatorReplacement {
    pub fn new(id: Uuid, name: impl Into<String>, label: impl Into<String>, target: Option<Uuid>) -> Self {
        Self {
            id,
            name: name.into(),
            label: label.into(),
            target,
            valid: target.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorGroupReplacement {
    pub id: Uuid,
    pub label: String,
    /// Informational only, validity comes from the indicators
    pub target: Option<Uuid>,
    pub indicators: Vec<IndicatorReplacement>,
    pub valid: bool,
}

impl IndicatorGroupReplacement {
    pub fn new(
        id: Uuid,
        label: impl Into<String>,
        target: Option<Uuid>,
        indicators: Vec<IndicatorReplacement>,
    ) -> Self {
        let valid = indicators.iter().all(|i| i.valid);
        Self {
            id,
            label: label.into(),
            target,
            indicators,
            valid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReplacement {
    pub id: Uuid,
    pub code: String,
    /// Location name
    pub label: String,
    /// Same id if the replacement kept it, else the only replacement
    /// location with this level and code
    pub target: Option<Uuid>,
    pub valid: bool,
}

impl LocationReplacement {
    pub fn new(id: Uuid, code: impl Into<String>, label: impl Into<String>, target: Option<Uuid>) -> Self {
        Self {
            id,
            code: code.into(),
            label: label.into(),
            target,
            valid: target.is_some(),
        }
    }
}

/// Locations of one geographic level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationLevelReplacement {
    pub level: GeographicLevel,
    /// Display name of the level
    pub label: String,
    pub locations: Vec<LocationReplacement>,
    pub valid: bool,
}

impl LocationLevelReplacement {
    pub fn new(level: GeographicLevel, locations: Vec<LocationReplacement>) -> Self {
        let valid = locations.iter().all(|l| l.valid);
        Self {
            level,
            label: level.label().to_string(),
            locations,
            valid,
        }
    }
}

/// One end of a queried time period range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriodReplacement {
    pub year: i32,
    pub code: String,
    /// The replacement subject has data for this period
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriodRangeReplacement {
    pub start: TimePeriodReplacement,
    pub end: TimePeriodReplacement,
    pub valid: bool,
}

impl TimePeriodRangeReplacement {
    pub fn new(start: TimePeriodReplacement, end: TimePeriodReplacement) -> Self {
        let valid = start.valid && end.valid;
        Self { start, end, valid }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBlockReplacementPlan {
    pub id: Uuid,
    pub name: String,
    /// Queried filter items, under their filter and group
    pub filters: Vec<FilterReplacement>,
    /// Queried indicators, under their group
    pub indicator_groups: Vec<IndicatorGroupReplacement>,
    /// Queried locations, by geographic level
    pub locations: Vec<LocationLevelReplacement>,
    pub time_periods: TimePeriodRangeReplacement,
    /// Every filter item, indicator, location and both time periods resolved
    pub valid: bool,
}

impl DataBlockReplacementPlan {
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        filters: Vec<FilterReplacement>,
        indicator_groups: Vec<IndicatorGroupReplacement>,
        locations: Vec<LocationLevelReplacement>,
        time_periods: TimePeriodRangeReplacement,
    ) -> Self {
        let valid = filters.iter().all(|f| f.valid)
            && indicator_groups.iter().all(|g| g.valid)
            && locations.iter().all(|l| l.valid)
            && time_periods.valid;
        Self {
            id,
            name: name.into(),
            filters,
            indicator_groups,
            locations,
            time_periods,
            valid,
        }
    }

    /// Original filter item id -> target
    pub fn filter_item_targets(&self) -> HashMap<Uuid, Option<Uuid>> {
        self.filters
            .iter()
            .flat_map(|f| &f.groups)
            .flat_map(|g| &g.items)
            .map(|i| (i.id, i.target))
            .collect()
    }

    /// Original indicator id -> target
    pub fn indicator_targets(&self) -> HashMap<Uuid, Option<Uuid>> {
        indicator_targets(&self.indicator_groups)
    }

    /// Original location id -> target
    pub fn location_targets(&self) -> HashMap<Uuid, Option<Uuid>> {
        self.locations
            .iter()
            .flat_map(|level| &level.locations)
            .map(|l| (l.id, l.target))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FootnoteFilterReplacement {
    pub id: Uuid,
    pub label: String,
    pub target: Option<Uuid>,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FootnoteFilterGroupReplacement {
    pub id: Uuid,
    pub label: String,
    /// Owning filter, for display
    pub filter_id: Uuid,
    pub filter_label: String,
    pub target: Option<Uuid>,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FootnoteFilterItemReplacement {
    pub id: Uuid,
    pub label: String,
    pub filter_id: Uuid,
    pub filter_label: String,
    pub group_id: Uuid,
    pub group_label: String,
    pub target: Option<Uuid>,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FootnoteReplacementPlan {
    pub id: Uuid,
    pub content: String,
    /// Linked filters of the original subject
    pub filters: Vec<FootnoteFilterReplacement>,
    pub filter_groups: Vec<FootnoteFilterGroupReplacement>,
    pub filter_items: Vec<FootnoteFilterItemReplacement>,
    /// Linked indicators, under their group
    pub indicator_groups: Vec<IndicatorGroupReplacement>,
    /// Every linked entity resolved
    pub valid: bool,
}

impl FootnoteReplacementPlan {
    pub fn new(
        id: Uuid,
        content: impl Into<String>,
        filters: Vec<FootnoteFilterReplacement>,
        filter_groups: Vec<FootnoteFilterGroupReplacement>,
        filter_items: Vec<FootnoteFilterItemReplacement>,
        indicator_groups: Vec<IndicatorGroupReplacement>,
    ) -> Self {
        let valid = filters.iter().all(|f| f.valid)
            && filter_groups.iter().all(|g| g.valid)
            && filter_items.iter().all(|i| i.valid)
            && indicator_groups.iter().all(|g| g.valid);
        Self {
            id,
            content: content.into(),
            filters,
            filter_groups,
            filter_items,
            indicator_groups,
            valid,
        }
    }

    pub fn filter_targets(&self) -> HashMap<Uuid, Option<Uuid>> {
        self.filters.iter().map(|f| (f.id, f.target)).collect()
    }

    pub fn filter_group_targets(&self) -> HashMap<Uuid, Option<Uuid>> {
        self.filter_groups.iter().map(|g| (g.id, g.target)).collect()
    }

    pub fn filter_item_targets(&self) -> HashMap<Uuid, Option<Uuid>> {
        self.filter_items.iter().map(|i| (i.id, i.target)).collect()
    }

    pub fn indicator_targets(&self) -> HashMap<Uuid, Option<Uuid>> {
        indicator_targets(&self.indicator_groups)
    }
}

fn indicator_targets(groups: &[IndicatorGroupReplacement]) -> HashMap<Uuid, Option<Uuid>> {
    groups
        .iter()
        .flat_map(|g| &g.indicators)
        .map(|i| (i.id, i.target))
        .collect()
}

/// An item present only in the replacement subject. There is nothing in the
/// original to map from, so `target` is always `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFilterItem {
    pub id: Uuid,
    pub label: String,
    pub target: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFilterGroup {
    pub id: Uuid,
    pub label: String,
    /// Filter the group belongs to in the replacement subject
    pub filter_name: String,
    pub target: Option<Uuid>,
    pub items: Vec<NewFilterItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFilter {
    pub id: Uuid,
    pub name: String,
    pub label: String,
    pub target: Option<Uuid>,
    pub groups: Vec<NewFilterGroup>,
}

/// Filters, groups and items introduced by the replacement subject.
/// Informational only; never affects validity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewlyIntroduced {
    /// Filters with no same-named original filter
    pub filters: Vec<NewFilter>,
    /// New groups under a matched filter
    pub filter_groups: Vec<NewFilterGroup>,
    /// New items under a matched group
    pub filter_items: Vec<NewFilterItemInGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFilterItemInGroup {
    pub filter_name: String,
    pub group_label: String,
    #[serde(flatten)]
    pub item: NewFilterItem,
}

impl NewlyIntroduced {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.filter_groups.is_empty() && self.filter_items.is_empty()
    }
}

/// The public API data set version published from the original file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDataSetReplacementPlan {
    pub data_set_id: Uuid,
    pub data_set_title: String,
    pub version_id: Uuid,
    /// Public version, e.g. "1.0.1"
    pub version: String,
    pub status: DataSetVersionStatus,
    /// Location and filter mapping progress, if mapping has started
    pub mapping_status: Option<MappingStatus>,
    /// Draft, with any mapping complete
    pub ready_to_publish: bool,
    /// Ready, and for a patch version with a mapping, no major change
    pub valid: bool,
}

/// The full replacement plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementPlan {
    pub original_subject_id: Uuid,
    pub replacement_subject_id: Uuid,
    /// Data blocks querying the original subject
    pub data_blocks: Vec<DataBlockReplacementPlan>,
    /// Footnotes linked to the original subject or its entities
    pub footnotes: Vec<FootnoteReplacementPlan>,
    pub newly_introduced: NewlyIntroduced,
    /// Present when the original file backs a public API data set
    pub api_data_set: Option<ApiDataSetReplacementPlan>,
    /// Every data block, footnote and the API data set resolved.
    /// Only a valid plan may be applied.
    pub valid: bool,
}

impl ReplacementPlan {
    pub fn new(
        original_subject_id: Uuid,
        replacement_subject_id: Uuid,
        data_blocks: Vec<DataBlockReplacementPlan>,
        footnotes: Vec<FootnoteReplacementPlan>,
        newly_introduced: NewlyIntroduced,
        api_data_set: Option<ApiDataSetReplacementPlan>,
    ) -> Self {
        let valid = data_blocks.iter().all(|db| db.valid)
            && footnotes.iter().all(|f| f.valid)
            && api_data_set.as_ref().map_or(true, |a| a.valid);
        Self {
            original_subject_id,
            replacement_subject_id,
            data_blocks,
            footnotes,
            newly_introduced,
            api_data_set,
            valid,
        }
    }

    /// Number of data block and footnote sub-plans that do not resolve
    pub fn invalid_count(&self) -> usize {
        self.data_blocks.iter().filter(|db| !db.valid).count()
            + self.footnotes.iter().filter(|f| !f.valid).count()
            + usize::from(self.api_data_set.as_ref().is_some_and(|a| !a.valid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time_periods(valid: bool) -> TimePeriodRangeReplacement {
        TimePeriodRangeReplacement::new(
            TimePeriodReplacement {
                year: 2020,
                code: "AY".to_string(),
                valid: true,
            },
            TimePeriodReplacement {
                year: 2021,
                code: "AY".to_string(),
                valid,
            },
        )
    }

    fn block(items: Vec<FilterItemReplacement>, periods_valid: bool) -> DataBlockReplacementPlan {
        let group = FilterGroupReplacement::new(Uuid::new_v4(), "Total", None, items);
        let filter = FilterReplacement::new(Uuid::new_v4(), "gender", "Gender", None, vec![group]);
        DataBlockReplacementPlan::new(
            Uuid::new_v4(),
            "Absence by gender",
            vec![filter],
            vec![],
            vec![],
            time_periods(periods_valid),
        )
    }

    #[test]
    fn test_validity_rolls_up_from_leaves() {
        let resolved = FilterItemReplacement::new(Uuid::new_v4(), "Male", Some(Uuid::new_v4()));
        let unresolved = FilterItemReplacement::new(Uuid::new_v4(), "Female", None);

        assert!(block(vec![resolved.clone()], true).valid);
        assert!(!block(vec![resolved.clone(), unresolved], true).valid);
        assert!(!block(vec![resolved], false).valid);
    }

    #[test]
    fn test_plan_validity_includes_api_data_set() {
        let resolved = FilterItemReplacement::new(Uuid::new_v4(), "Male", Some(Uuid::new_v4()));
        let api = ApiDataSetReplacementPlan {
            data_set_id: Uuid::new_v4(),
            data_set_title: "Pupil absence".to_string(),
            version_id: Uuid::new_v4(),
            version: "1.0.1".to_string(),
            status: DataSetVersionStatus::Draft,
            mapping_status: None,
            ready_to_publish: false,
            valid: false,
        };

        let plan = ReplacementPlan::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![block(vec![resolved], true)],
            vec![],
            NewlyIntroduced::default(),
            Some(api),
        );

        assert!(!plan.valid);
        assert_eq!(plan.invalid_count(), 1);
    }

    #[test]
    fn test_filter_item_targets() {
        let target = Uuid::new_v4();
        let resolved = FilterItemReplacement::new(Uuid::new_v4(), "Male", Some(target));
        let id = resolved.id;
        let plan = block(vec![resolved], true);

        assert_eq!(plan.filter_item_targets().get(&id), Some(&Some(target)));
    }
}
