//! Subject Metadata
//!
//! A read-only, pre-indexed snapshot of one subject's category metadata.
//! Built once per replacement request and shared by every matcher lookup.

use crate::error::ReplacementResult;
use crate::models::{
    Filter, FilterGroup, FilterItem, GeographicLevel, Indicator, IndicatorGroup, Location,
    TimePeriod,
};
use crate::store::StatisticsStore;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct GroupIndex {
    position: usize,
    items_by_label: HashMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
struct FilterIndex {
    position: usize,
    groups_by_label: HashMap<String, GroupIndex>,
}

/// A filter item together with the group and filter that own it
#[derive(Debug, Clone, Copy)]
pub struct FilterItemPath<'a> {
    pub filter: &'a Filter,
    pub group: &'a FilterGroup,
    pub item: &'a FilterItem,
}

/// Category metadata for one subject
#[derive(Debug, Clone)]
pub struct SubjectMeta {
    subject_id: Uuid,
    filters: Vec<Filter>,
    indicator_groups: Vec<IndicatorGroup>,
    locations: Vec<Location>,
    time_periods: Vec<TimePeriod>,

    // Business-key indexes
    filters_by_name: HashMap<String, FilterIndex>,
    indicators_by_name: HashMap<String, (usize, usize)>,
    indicator_groups_by_label: HashMap<String, usize>,
    locations_by_code: HashMap<(GeographicLevel, String), Vec<usize>>,
    time_period_set: HashSet<TimePeriod>,

    // Id indexes
    filters_by_id: HashMap<Uuid, usize>,
    filter_groups_by_id: HashMap<Uuid, (usize, usize)>,
    filter_items_by_id: HashMap<Uuid, (usize, usize, usize)>,
    indicators_by_id: HashMap<Uuid, (usize, usize)>,
    locations_by_id: HashMap<Uuid, usize>,
}

impl SubjectMeta {
    pub fn new(
        subject_id: Uuid,
        filters: Vec<Filter>,
        indicator_groups: Vec<IndicatorGroup>,
        locations: Vec<Location>,
        time_periods: Vec<TimePeriod>,
    ) -> Self {
        let mut filters_by_name: HashMap<String, FilterIndex> = HashMap::new();
        let mut filters_by_id = HashMap::new();
        let mut filter_groups_by_id = HashMap::new();
        let mut filter_items_by_id = HashMap::new();

        for (f, filter) in filters.iter().enumerate() {
            filters_by_id.insert(filter.id, f);
            for (g, group) in filter.groups.iter().enumerate() {
                filter_groups_by_id.insert(group.id, (f, g));
                for (i, item) in group.items.iter().enumerate() {
                    filter_items_by_id.insert(item.id, (f, g, i));
                }
            }

            // First occurrence of a business key wins
            if filters_by_name.contains_key(&filter.name) {
                continue;
            }

            let mut filter_index = FilterIndex {
                position: f,
                ..Default::default()
            };
            for (g, group) in filter.groups.iter().enumerate() {
                let group_index = filter_index
                    .groups_by_label
                    .entry(group.label.clone())
                    .or_insert_with(|| GroupIndex {
                        position: g,
                        ..Default::default()
                    });
                if group_index.position != g {
                    continue;
                }
                for (i, item) in group.items.iter().enumerate() {
                    group_index
                        .items_by_label
                        .entry(item.label.clone())
                        .or_insert(i);
                }
            }
            filters_by_name.insert(filter.name.clone(), filter_index);
        }

        let mut indicators_by_name = HashMap::new();
        let mut indicators_by_id = HashMap::new();
        let mut indicator_groups_by_label = HashMap::new();
        for (g, group) in indicator_groups.iter().enumerate() {
            indicator_groups_by_label
                .entry(group.label.clone())
                .or_insert(g);
            for (i, indicator) in group.indicators.iter().enumerate() {
                indicators_by_id.insert(indicator.id, (g, i));
                indicators_by_name
                    .entry(indicator.name.clone())
                    .or_insert((g, i));
            }
        }

        let mut locations_by_id = HashMap::new();
        let mut locations_by_code: HashMap<(GeographicLevel, String), Vec<usize>> =
            HashMap::new();
        for (l, location) in locations.iter().enumerate() {
            locations_by_id.insert(location.id, l);
            locations_by_code
                .entry((location.geographic_level, location.code.clone()))
                .or_default()
                .push(l);
        }

        let time_period_set = time_periods.iter().cloned().collect();

        Self {
            subject_id,
            filters,
            indicator_groups,
            locations,
            time_periods,
            filters_by_name,
            indicators_by_name,
            indicator_groups_by_label,
            locations_by_code,
            time_period_set,
            filters_by_id,
            filter_groups_by_id,
            filter_items_by_id,
            indicators_by_id,
            locations_by_id,
        }
    }

    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn indicator_groups(&self) -> &[IndicatorGroup] {
        &self.indicator_groups
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn time_periods(&self) -> &[TimePeriod] {
        &self.time_periods
    }

    // ---- business-key lookups ----

    pub fn filter_by_name(&self, name: &str) -> Option<&Filter> {
        self.filters_by_name
            .get(name)
            .map(|index| &self.filters[index.position])
    }

    pub fn filter_group_by_label(&self, filter_name: &str, group_label: &str) -> Option<&FilterGroup> {
        let filter_index = self.filters_by_name.get(filter_name)?;
        let group_index = filter_index.groups_by_label.get(group_label)?;
        Some(&self.filters[filter_index.position].groups[group_index.position])
    }

    pub fn filter_item_by_label(
        &self,
        filter_name: &str,
        group_label: &str,
        item_label: &str,
    ) -> Option<&FilterItem> {
        let filter_index = self.filters_by_name.get(filter_name)?;
        let group_index = filter_index.groups_by_label.get(group_label)?;
        let item = *group_index.items_by_label.get(item_label)?;
        Some(&self.filters[filter_index.position].groups[group_index.position].items[item])
    }

    pub fn indicator_by_name(&self, name: &str) -> Option<&Indicator> {
        self.indicators_by_name
            .get(name)
            .map(|&(g, i)| &self.indicator_groups[g].indicators[i])
    }

    pub fn indicator_group_by_label(&self, label: &str) -> Option<&IndicatorGroup> {
        self.indicator_groups_by_label
            .get(label)
            .map(|&g| &self.indicator_groups[g])
    }

    /// All locations at `level` sharing `code`
    pub fn locations_with_code(&self, level: GeographicLevel, code: &str) -> Vec<&Location> {
        self.locations_by_code
            .get(&(level, code.to_string()))
            .map(|positions| positions.iter().map(|&l| &self.locations[l]).collect())
            .unwrap_or_default()
    }

    pub fn has_time_period(&self, period: &TimePeriod) -> bool {
        self.time_period_set.contains(period)
    }

    // ---- id lookups ----

    pub fn filter(&self, id: Uuid) -> Option<&Filter> {
        self.filters_by_id.get(&id).map(|&f| &self.filters[f])
    }

    pub fn filter_group(&self, id: Uuid) -> Option<(&Filter, &FilterGroup)> {
        self.filter_groups_by_id.get(&id).map(|&(f, g)| {
            let filter = &self.filters[f];
            (filter, &filter.groups[g])
        })
    }

    pub fn filter_item(&self, id: Uuid) -> Option<FilterItemPath<'_>> {
        self.filter_items_by_id.get(&id).map(|&(f, g, i)| {
            let filter = &self.filters[f];
            let group = &filter.groups[g];
            FilterItemPath {
                filter,
                group,
                item: &group.items[i],
            }
        })
    }

    pub fn indicator(&self, id: Uuid) -> Option<(&IndicatorGroup, &Indicator)> {
        self.indicators_by_id.get(&id).map(|&(g, i)| {
            let group = &self.indicator_groups[g];
            (group, &group.indicators[i])
        })
    }

    pub fn location(&self, id: Uuid) -> Option<&Location> {
        self.locations_by_id.get(&id).map(|&l| &self.locations[l])
    }

    /// Ids of every filter, group, item and indicator owned by this subject
    pub fn entity_ids(&self) -> HashSet<Uuid> {
        self.filters_by_id
            .keys()
            .chain(self.filter_groups_by_id.keys())
            .chain(self.filter_items_by_id.keys())
            .chain(self.indicators_by_id.keys())
            .copied()
            .collect()
    }
}

/// Load the category metadata of a subject from the statistics store
pub async fn extract_subject_meta(
    store: &StatisticsStore,
    subject_id: Uuid,
) -> ReplacementResult<SubjectMeta> {
    let record = store.get_subject(subject_id).await?;

    let meta = SubjectMeta::new(
        subject_id,
        record.filters,
        record.indicator_groups,
        record.locations,
        record.time_periods,
    );

    tracing::debug!(
        "Extracted metadata for subject {}: {} filters, {} indicator groups, {} locations, {} time periods",
        subject_id,
        meta.filters().len(),
        meta.indicator_groups().len(),
        meta.locations().len(),
        meta.time_periods().len()
    );

    Ok(meta)
}
