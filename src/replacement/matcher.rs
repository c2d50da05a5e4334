//! Matchers
//!
//! Answer "does this original item have an equivalent in the replacement
//! subject?" using strict, case-sensitive equality on durable keys.
//! Absence of a match is not an error here; callers record it as a null target.

use crate::meta::SubjectMeta;
use crate::models::{Filter, FilterGroup, FilterItem, GeographicLevel, Indicator, IndicatorGroup, Location, TimePeriod};
use uuid::Uuid;

pub fn match_filter<'a>(meta: &'a SubjectMeta, name: &str) -> Option<&'a Filter> {
    meta.filter_by_name(name)
}

/// Group lookup only happens under a matched filter
pub fn match_filter_group<'a>(
    meta: &'a SubjectMeta,
    filter_name: &str,
    group_label: &str,
) -> Option<&'a FilterGroup> {
    meta.filter_group_by_label(filter_name, group_label)
}

/// Item lookup only happens under a matched filter and group
pub fn match_filter_item<'a>(
    meta: &'a SubjectMeta,
    filter_name: &str,
    group_label: &str,
    item_label: &str,
) -> Option<&'a FilterItem> {
    meta.filter_item_by_label(filter_name, group_label, item_label)
}

pub fn match_indicator<'a>(meta: &'a SubjectMeta, name: &str) -> Option<&'a Indicator> {
    meta.indicator_by_name(name)
}

pub fn match_indicator_group<'a>(meta: &'a SubjectMeta, label: &str) -> Option<&'a IndicatorGroup> {
    meta.indicator_group_by_label(label)
}

/// Match a location by identity, falling back to a unique (level, code) pair.
///
/// Two or more candidates sharing the level and code are ambiguous and
/// produce no match; no disambiguation by name is attempted.
pub fn match_location<'a>(
    meta: &'a SubjectMeta,
    id: Uuid,
    level: GeographicLevel,
    code: &str,
) -> Option<&'a Location> {
    if let Some(location) = meta.location(id) {
        return Some(location);
    }

    match meta.locations_with_code(level, code).as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

pub fn time_period_valid(meta: &SubjectMeta, year: i32, code: &str) -> bool {
    meta.has_time_period(&TimePeriod::new(year, code))
}
