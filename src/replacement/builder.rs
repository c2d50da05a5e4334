//! Plan Builder
//!
//! Walks every data block, footnote and linked API data set version that
//! references the original subject, and resolves each reference against the
//! replacement subject. Building a plan performs no I/O and no writes.

use crate::error::{not_found_error, ReplacementResult};
use crate::label_order::{sort_by_label, LabelComparer};
use crate::meta::SubjectMeta;
use crate::models::{
    DataBlock, DataSetVersion, DataSetVersionStatus, Filter, FilterGroup, FilterItem, Footnote,
    GeographicLevel, Indicator, IndicatorGroup, MappingStatus, TimePeriod,
};
use crate::replacement::matcher::{
    match_filter, match_filter_group, match_filter_item, match_indicator, match_indicator_group,
    match_location, time_period_valid,
};
use crate::replacement::plan::{
    ApiDataSetReplacementPlan, DataBlockReplacementPlan, FilterGroupReplacement,
    FilterItemReplacement, FilterReplacement, FootnoteFilterGroupReplacement,
    FootnoteFilterItemReplacement, FootnoteFilterReplacement, FootnoteReplacementPlan,
    IndicatorGroupReplacement, IndicatorReplacement, LocationLevelReplacement,
    LocationReplacement, NewFilter, NewFilterGroup, NewFilterItem, NewFilterItemInGroup,
    NewlyIntroduced, ReplacementPlan, TimePeriodRangeReplacement, TimePeriodReplacement,
};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Public API data set version linked to the original release file
#[derive(Debug, Clone)]
pub struct LinkedDataSetVersion {
    pub version: DataSetVersion,
    /// `None` when the version has no incremental mapping
    pub mapping: Option<MappingStatus>,
}

/// Everything a plan is built from
pub struct PlanInputs<'a> {
    pub original: &'a SubjectMeta,
    pub replacement: &'a SubjectMeta,
    pub data_blocks: &'a [DataBlock],
    pub footnotes: &'a [Footnote],
    pub linked_data_set: Option<&'a LinkedDataSetVersion>,
}

pub struct PlanBuilder<'c> {
    comparer: &'c dyn LabelComparer,
}

impl<'c> PlanBuilder<'c> {
    pub fn new(comparer: &'c dyn LabelComparer) -> Self {
        Self { comparer }
    }

    pub fn build(&self, inputs: &PlanInputs<'_>) -> ReplacementResult<ReplacementPlan> {
        let original = inputs.original;
        let replacement = inputs.replacement;

        let data_blocks = inputs
            .data_blocks
            .iter()
            .filter(|db| db.query.subject_id == original.subject_id())
            .map(|db| self.data_block_plan(db, original, replacement))
            .collect::<ReplacementResult<Vec<_>>>()?;

        let entity_ids = original.entity_ids();
        let footnotes = inputs
            .footnotes
            .iter()
            .filter(|f| f.references_any(original.subject_id(), &entity_ids))
            .map(|f| self.footnote_plan(f, original, replacement))
            .collect::<ReplacementResult<Vec<_>>>()?;

        let newly_introduced = self.newly_introduced(original, replacement);
        let api_data_set = inputs.linked_data_set.map(api_data_set_plan);

        let plan = ReplacementPlan::new(
            original.subject_id(),
            replacement.subject_id(),
            data_blocks,
            footnotes,
            newly_introduced,
            api_data_set,
        );

        tracing::info!(
            "Built replacement plan {} -> {}: {} data blocks, {} footnotes, valid: {}",
            plan.original_subject_id,
            plan.replacement_subject_id,
            plan.data_blocks.len(),
            plan.footnotes.len(),
            plan.valid
        );

        Ok(plan)
    }

    fn data_block_plan(
        &self,
        data_block: &DataBlock,
        original: &SubjectMeta,
        replacement: &SubjectMeta,
    ) -> ReplacementResult<DataBlockReplacementPlan> {
        let owner = format!("data block {}", data_block.id);
        let query = &data_block.query;

        let filters = self.filters_plan(query.filters.iter().copied(), original, replacement, &owner)?;
        let indicator_groups =
            self.indicator_groups_plan(query.indicators.iter().copied(), original, replacement, &owner)?;
        let locations =
            self.locations_plan(query.location_ids.iter().copied(), original, replacement, &owner)?;
        let time_periods = TimePeriodRangeReplacement::new(
            time_period_plan(replacement, &query.time_period.start),
            time_period_plan(replacement, &query.time_period.end),
        );

        let plan = DataBlockReplacementPlan::new(
            data_block.id,
            &data_block.name,
            filters,
            indicator_groups,
            locations,
            time_periods,
        );

        if !plan.valid {
            tracing::debug!("Data block '{}' ({}) cannot be replaced", plan.name, plan.id);
        }

        Ok(plan)
    }

    /// Filter items are reported under their filter and group
    fn filters_plan(
        &self,
        item_ids: impl IntoIterator<Item = Uuid>,
        original: &SubjectMeta,
        replacement: &SubjectMeta,
        owner: &str,
    ) -> ReplacementResult<Vec<FilterReplacement>> {
        type Groups<'m> = BTreeMap<Uuid, (&'m FilterGroup, Vec<&'m FilterItem>)>;
        let mut grouped: BTreeMap<Uuid, (&Filter, Groups<'_>)> = BTreeMap::new();

        for item_id in item_ids {
            let path = original.filter_item(item_id).ok_or_else(|| {
                not_found_error(format!(
                    "Filter item {} referenced by {} is not in subject {}",
                    item_id, owner, original.subject_id()
                ))
            })?;
            grouped
                .entry(path.filter.id)
                .or_insert_with(|| (path.filter, BTreeMap::new()))
                .1
                .entry(path.group.id)
                .or_insert_with(|| (path.group, Vec::new()))
                .1
                .push(path.item);
        }

        let mut filters: Vec<FilterReplacement> = grouped
            .into_values()
            .map(|(filter, groups)| {
                let mut groups: Vec<FilterGroupReplacement> = groups
                    .into_values()
                    .map(|(group, items)| {
                        let mut items: Vec<FilterItemReplacement> = items
                            .into_iter()
                            .map(|item| {
                                let target =
                                    match_filter_item(replacement, &filter.name, &group.label, &item.label)
                                        .map(|i| i.id);
                                FilterItemReplacement::new(item.id, &item.label, target)
                            })
                            .collect();
                        sort_by_label(&mut items, self.comparer, |i| i.label.as_str());

                        let target = match_filter_group(replacement, &filter.name, &group.label).map(|g| g.id);
                        FilterGroupReplacement::new(group.id, &group.label, target, items)
                    })
                    .collect();
                sort_by_label(&mut groups, self.comparer, |g| g.label.as_str());

                let target = match_filter(replacement, &filter.name).map(|f| f.id);
                FilterReplacement::new(filter.id, &filter.name, &filter.label, target, groups)
            })
            .collect();
        sort_by_label(&mut filters, self.comparer, |f| f.label.as_str());

        Ok(filters)
    }

    fn indicator_groups_plan(
        &self,
        indicator_ids: impl IntoIterator<Item = Uuid>,
        original: &SubjectMeta,
        replacement: &SubjectMeta,
        owner: &str,
    ) -> ReplacementResult<Vec<IndicatorGroupReplacement>> {
        let mut grouped: BTreeMap<Uuid, (&IndicatorGroup, Vec<&Indicator>)> = BTreeMap::new();

        for indicator_id in indicator_ids {
            let (group, indicator) = original.indicator(indicator_id).ok_or_else(|| {
                not_found_error(format!(
                    "Indicator {} referenced by {} is not in subject {}",
                    indicator_id, owner, original.subject_id()
                ))
            })?;
            grouped
                .entry(group.id)
                .or_insert_with(|| (group, Vec::new()))
                .1
                .push(indicator);
        }

        let mut groups: Vec<IndicatorGroupReplacement> = grouped
            .into_values()
            .map(|(group, indicators)| {
                let mut indicators: Vec<IndicatorReplacement> = indicators
                    .into_iter()
                    .map(|indicator| {
                        let target = match_indicator(replacement, &indicator.name).map(|i| i.id);
                        IndicatorReplacement::new(indicator.id, &indicator.name, &indicator.label, target)
                    })
                    .collect();
                sort_by_label(&mut indicators, self.comparer, |i| i.label.as_str());

                let target = match_indicator_group(replacement, &group.label).map(|g| g.id);
                IndicatorGroupReplacement::new(group.id, &group.label, target, indicators)
            })
            .collect();
        sort_by_label(&mut groups, self.comparer, |g| g.label.as_str());

        Ok(groups)
    }

    fn locations_plan(
        &self,
        location_ids: impl IntoIterator<Item = Uuid>,
        original: &SubjectMeta,
        replacement: &SubjectMeta,
        owner: &str,
    ) -> ReplacementResult<Vec<LocationLevelReplacement>> {
        let mut by_level: BTreeMap<GeographicLevel, Vec<LocationReplacement>> = BTreeMap::new();

        for location_id in location_ids {
            let location = original.location(location_id).ok_or_else(|| {
                not_found_error(format!(
                    "Location {} referenced by {} is not in subject {}",
                    location_id, owner, original.subject_id()
                ))
            })?;
            let target = match_location(replacement, location.id, location.geographic_level, &location.code)
                .map(|l| l.id);
            by_level
                .entry(location.geographic_level)
                .or_default()
                .push(LocationReplacement::new(location.id, &location.code, &location.name, target));
        }

        let mut levels: Vec<LocationLevelReplacement> = by_level
            .into_iter()
            .map(|(level, mut locations)| {
                sort_by_label(&mut locations, self.comparer, |l| l.label.as_str());
                LocationLevelReplacement::new(level, locations)
            })
            .collect();
        sort_by_label(&mut levels, self.comparer, |l| l.label.as_str());

        Ok(levels)
    }

    /// Only links to entities of the original subject are planned; links to
    /// anything else are left alone when the plan is applied.
    fn footnote_plan(
        &self,
        footnote: &Footnote,
        original: &SubjectMeta,
        replacement: &SubjectMeta,
    ) -> ReplacementResult<FootnoteReplacementPlan> {
        let mut filters: Vec<FootnoteFilterReplacement> = footnote
            .filters
            .iter()
            .filter_map(|&id| original.filter(id))
            .map(|filter| {
                let target = match_filter(replacement, &filter.name).map(|f| f.id);
                FootnoteFilterReplacement {
                    id: filter.id,
                    label: filter.label.clone(),
                    target,
                    valid: target.is_some(),
                }
            })
            .collect();
        sort_by_label(&mut filters, self.comparer, |f| f.label.as_str());

        let mut filter_groups: Vec<FootnoteFilterGroupReplacement> = footnote
            .filter_groups
            .iter()
            .filter_map(|&id| original.filter_group(id))
            .map(|(filter, group)| {
                let target = match_filter_group(replacement, &filter.name, &group.label).map(|g| g.id);
                FootnoteFilterGroupReplacement {
                    id: group.id,
                    label: group.label.clone(),
                    filter_id: filter.id,
                    filter_label: filter.label.clone(),
                    target,
                    valid: target.is_some(),
                }
            })
            .collect();
        sort_by_label(&mut filter_groups, self.comparer, |g| g.label.as_str());

        let mut filter_items: Vec<FootnoteFilterItemReplacement> = footnote
            .filter_items
            .iter()
            .filter_map(|&id| original.filter_item(id))
            .map(|path| {
                let target =
                    match_filter_item(replacement, &path.filter.name, &path.group.label, &path.item.label)
                        .map(|i| i.id);
                FootnoteFilterItemReplacement {
                    id: path.item.id,
                    label: path.item.label.clone(),
                    filter_id: path.filter.id,
                    filter_label: path.filter.label.clone(),
                    group_id: path.group.id,
                    group_label: path.group.label.clone(),
                    target,
                    valid: target.is_some(),
                }
            })
            .collect();
        sort_by_label(&mut filter_items, self.comparer, |i| i.label.as_str());

        let indicator_ids: Vec<Uuid> = footnote
            .indicators
            .iter()
            .copied()
            .filter(|&id| original.indicator(id).is_some())
            .collect();
        let indicator_groups = self.indicator_groups_plan(
            indicator_ids,
            original,
            replacement,
            &format!("footnote {}", footnote.id),
        )?;

        Ok(FootnoteReplacementPlan::new(
            footnote.id,
            &footnote.content,
            filters,
            filter_groups,
            filter_items,
            indicator_groups,
        ))
    }

    /// Filters, groups and items that exist only in the replacement subject
    fn newly_introduced(&self, original: &SubjectMeta, replacement: &SubjectMeta) -> NewlyIntroduced {
        let mut introduced = NewlyIntroduced::default();

        for filter in replacement.filters() {
            if match_filter(original, &filter.name).is_none() {
                let mut groups: Vec<NewFilterGroup> =
                    filter.groups.iter().map(|g| self.new_group(filter, g)).collect();
                sort_by_label(&mut groups, self.comparer, |g| g.label.as_str());
                introduced.filters.push(NewFilter {
                    id: filter.id,
                    name: filter.name.clone(),
                    label: filter.label.clone(),
                    target: None,
                    groups,
                });
                continue;
            }

            for group in &filter.groups {
                if match_filter_group(original, &filter.name, &group.label).is_none() {
                    introduced.filter_groups.push(self.new_group(filter, group));
                    continue;
                }

                introduced.filter_items.extend(
                    group
                        .items
                        .iter()
                        .filter(|item| {
                            match_filter_item(original, &filter.name, &group.label, &item.label).is_none()
                        })
                        .map(|item| NewFilterItemInGroup {
                            filter_name: filter.name.clone(),
                            group_label: group.label.clone(),
                            item: new_item(item),
                        }),
                );
            }
        }

        sort_by_label(&mut introduced.filters, self.comparer, |f| f.label.as_str());
        sort_by_label(&mut introduced.filter_groups, self.comparer, |g| g.label.as_str());
        sort_by_label(&mut introduced.filter_items, self.comparer, |i| i.item.label.as_str());

        introduced
    }

    fn new_group(&self, filter: &Filter, group: &FilterGroup) -> NewFilterGroup {
        let mut items: Vec<NewFilterItem> = group.items.iter().map(new_item).collect();
        sort_by_label(&mut items, self.comparer, |i| i.label.as_str());
        NewFilterGroup {
            id: group.id,
            label: group.label.clone(),
            filter_name: filter.name.clone(),
            target: None,
            items,
        }
    }
}

fn new_item(item: &FilterItem) -> NewFilterItem {
    NewFilterItem {
        id: item.id,
        label: item.label.clone(),
        target: None,
    }
}

fn time_period_plan(replacement: &SubjectMeta, period: &TimePeriod) -> TimePeriodReplacement {
    TimePeriodReplacement {
        year: period.year,
        code: period.code.clone(),
        valid: time_period_valid(replacement, period.year, &period.code),
    }
}

/// A patch version cannot carry a major change, so an incrementally mapped
/// patch must be free of one. A version without a mapping only has to be ready.
fn api_data_set_plan(linked: &LinkedDataSetVersion) -> ApiDataSetReplacementPlan {
    let version = &linked.version;
    let mapping_complete = linked
        .mapping
        .map_or(true, |m| m.locations_complete && m.filters_complete);
    let ready_to_publish = version.status == DataSetVersionStatus::Draft && mapping_complete;

    let valid = match linked.mapping {
        Some(mapping) if version.version.is_patch() => {
            ready_to_publish && !mapping.has_major_version_update
        }
        _ => ready_to_publish,
    };

    ApiDataSetReplacementPlan {
        data_set_id: version.data_set_id,
        data_set_title: version.data_set_title.clone(),
        version_id: version.id,
        version: version.version.to_string(),
        status: version.status,
        mapping_status: linked.mapping,
        ready_to_publish,
        valid,
    }
}
