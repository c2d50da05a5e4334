//! Builders shared by unit tests

use crate::meta::SubjectMeta;
use crate::models::{
    AxisType, Chart, ChartAxis, ChartDataSet, ChartDataSetLocation, ChartLegend, ChartLegendItem,
    ChartType, DataBlock, File, FileType, Filter, FilterGroup, FilterItem, Footnote,
    FullTableQuery, GeographicLevel, Indicator, IndicatorGroup, Location, ReleaseFile,
    ReleaseVersion, Subject, TableConfiguration, TableHeader, TableHeaderType, TableHeaders,
    TimePeriod, TimePeriodQuery,
};
use crate::replacement::ReplacementService;
use crate::store::{ContentStore, InMemoryDataSetVersions, StatisticsStore, StoreFileRemover, SubjectRecord};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) struct SubjectBuilder {
    subject: Subject,
    filters: Vec<Filter>,
    indicator_groups: Vec<IndicatorGroup>,
    locations: Vec<Location>,
    time_periods: Vec<TimePeriod>,
}

impl SubjectBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            subject: Subject {
                id: Uuid::new_v4(),
                name: name.to_string(),
            },
            filters: vec![],
            indicator_groups: vec![],
            locations: vec![],
            time_periods: vec![],
        }
    }

    pub fn id(&self) -> Uuid {
        self.subject.id
    }

    pub fn filter(mut self, name: &str, label: &str, groups: Vec<(&str, Vec<&str>)>) -> Self {
        self.filters.push(Filter {
            id: Uuid::new_v4(),
            subject_id: self.subject.id,
            name: name.to_string(),
            label: label.to_string(),
            hint: None,
            groups: groups
                .into_iter()
                .map(|(group, items)| FilterGroup {
                    id: Uuid::new_v4(),
                    label: group.to_string(),
                    items: items
                        .into_iter()
                        .map(|item| FilterItem {
                            id: Uuid::new_v4(),
                            label: item.to_string(),
                        })
                        .collect(),
                })
                .collect(),
        });
        self
    }

    /// Indicators are labelled with their name
    pub fn indicator_group(mut self, label: &str, names: Vec<&str>) -> Self {
        self.indicator_groups.push(IndicatorGroup {
            id: Uuid::new_v4(),
            subject_id: self.subject.id,
            label: label.to_string(),
            indicators: names
                .into_iter()
                .map(|name| Indicator {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    label: name.to_string(),
                    unit: String::new(),
                    decimal_places: None,
                })
                .collect(),
        });
        self
    }

    pub fn location(self, level: GeographicLevel, code: &str, name: &str) -> Self {
        self.with_location(Location {
            id: Uuid::new_v4(),
            geographic_level: level,
            code: code.to_string(),
            name: name.to_string(),
        })
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    pub fn time_periods(mut self, periods: Vec<(i32, &str)>) -> Self {
        self.time_periods
            .extend(periods.into_iter().map(|(year, code)| TimePeriod::new(year, code)));
        self
    }

    pub fn record(&self) -> SubjectRecord {
        SubjectRecord {
            subject: self.subject.clone(),
            filters: self.filters.clone(),
            indicator_groups: self.indicator_groups.clone(),
            locations: self.locations.clone(),
            time_periods: self.time_periods.clone(),
        }
    }

    pub fn meta(&self) -> SubjectMeta {
        SubjectMeta::new(
            self.subject.id,
            self.filters.clone(),
            self.indicator_groups.clone(),
            self.locations.clone(),
            self.time_periods.clone(),
        )
    }

    fn find_filter(&self, name: &str) -> &Filter {
        self.filters
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no filter {}", name))
    }

    pub fn filter_id(&self, name: &str) -> Uuid {
        self.find_filter(name).id
    }

    pub fn group_id(&self, filter: &str, group: &str) -> Uuid {
        self.find_filter(filter)
            .groups
            .iter()
            .find(|g| g.label == group)
            .unwrap_or_else(|| panic!("no group {}", group))
            .id
    }

    pub fn item_id(&self, filter: &str, group: &str, item: &str) -> Uuid {
        self.find_filter(filter)
            .groups
            .iter()
            .find(|g| g.label == group)
            .and_then(|g| g.items.iter().find(|i| i.label == item))
            .unwrap_or_else(|| panic!("no item {}", item))
            .id
    }

    pub fn indicator_id(&self, name: &str) -> Uuid {
        self.indicator_groups
            .iter()
            .flat_map(|g| &g.indicators)
            .find(|i| i.name == name)
            .unwrap_or_else(|| panic!("no indicator {}", name))
            .id
    }

    pub fn location_with_code(&self, code: &str) -> Location {
        self.locations
            .iter()
            .find(|l| l.code == code)
            .cloned()
            .unwrap_or_else(|| panic!("no location {}", code))
    }

    /// A data block querying the given ids across the subject's first and last time periods,
    /// with one table column per filter item and a line chart per filter item.
    pub fn data_block(
        &self,
        release_version_id: Uuid,
        name: &str,
        items: Vec<Uuid>,
        indicators: Vec<Uuid>,
        locations: Vec<Uuid>,
    ) -> DataBlock {
        let start = self.time_periods.first().cloned().expect("subject has time periods");
        let end = self.time_periods.last().cloned().expect("subject has time periods");

        let location_cells: Vec<TableHeader> = locations
            .iter()
            .map(|id| {
                let location = self
                    .locations
                    .iter()
                    .find(|l| l.id == *id)
                    .expect("location belongs to subject");
                TableHeader {
                    header_type: TableHeaderType::Location,
                    value: id.to_string(),
                    level: Some(location.geographic_level),
                }
            })
            .collect();

        let chart_location = locations.first().and_then(|id| {
            self.locations
                .iter()
                .find(|l| l.id == *id)
                .map(|l| ChartDataSetLocation {
                    level: l.geographic_level,
                    value: l.id,
                })
        });

        let data_sets: Vec<ChartDataSet> = items
            .iter()
            .map(|item| ChartDataSet {
                filters: vec![*item],
                indicator: indicators[0],
                location: chart_location.clone(),
                time_period: None,
            })
            .collect();

        DataBlock {
            id: Uuid::new_v4(),
            release_version_id,
            name: name.to_string(),
            heading: None,
            query: FullTableQuery {
                subject_id: self.subject.id,
                filters: items.iter().copied().collect(),
                indicators: indicators.iter().copied().collect(),
                location_ids: locations.iter().copied().collect(),
                time_period: TimePeriodQuery {
                    start: start.clone(),
                    end,
                },
            },
            table: TableConfiguration {
                table_headers: TableHeaders {
                    column_groups: vec![vec![TableHeader::new(
                        TableHeaderType::TimePeriod,
                        start.key(),
                    )]],
                    columns: items
                        .iter()
                        .map(|id| TableHeader::new(TableHeaderType::Filter, id))
                        .collect(),
                    row_groups: vec![location_cells],
                    rows: indicators
                        .iter()
                        .map(|id| TableHeader::new(TableHeaderType::Indicator, id))
                        .collect(),
                },
            },
            charts: vec![Chart {
                chart_type: ChartType::Line,
                title: name.to_string(),
                legend: Some(ChartLegend {
                    items: data_sets
                        .iter()
                        .map(|data_set| ChartLegendItem {
                            data_set: data_set.clone(),
                            label: "Series".to_string(),
                            colour: None,
                        })
                        .collect(),
                }),
                axes: BTreeMap::from([(
                    AxisType::Major,
                    ChartAxis {
                        data_sets,
                        title: None,
                    },
                )]),
            }],
        }
    }
}

pub(crate) fn footnote(release_version_id: Uuid, content: &str) -> Footnote {
    Footnote {
        id: Uuid::new_v4(),
        release_version_id,
        content: content.to_string(),
        subjects: vec![],
        filters: vec![],
        filter_groups: vec![],
        filter_items: vec![],
        indicators: vec![],
    }
}

/// Stores seeded with an original and a replacement data file linked to one release version
pub(crate) struct Seeded {
    pub release_version_id: Uuid,
    pub original_file_id: Uuid,
    pub replacement_file_id: Uuid,
    pub statistics: Arc<StatisticsStore>,
    pub content: Arc<ContentStore>,
    pub data_sets: Arc<InMemoryDataSetVersions>,
}

impl Seeded {
    pub async fn new(original: &SubjectBuilder, replacement: &SubjectBuilder) -> Self {
        let statistics = Arc::new(StatisticsStore::new());
        let content = Arc::new(ContentStore::new());
        let data_sets = Arc::new(InMemoryDataSetVersions::new());

        let release_version_id = Uuid::new_v4();
        let original_file_id = Uuid::new_v4();
        let replacement_file_id = Uuid::new_v4();

        statistics.insert_subject(original.record()).await;
        statistics.insert_subject(replacement.record()).await;

        content
            .insert_release_version(ReleaseVersion {
                id: release_version_id,
                release_id: Uuid::new_v4(),
                version: 0,
                previous_version_id: None,
                published: None,
            })
            .await;
        content
            .insert_file(File {
                id: original_file_id,
                file_type: FileType::Data,
                filename: "absence.csv".to_string(),
                subject_id: Some(original.id()),
                replaced_by_id: Some(replacement_file_id),
                replacing_id: None,
                created: Utc::now(),
            })
            .await;
        content
            .insert_file(File {
                id: replacement_file_id,
                file_type: FileType::Data,
                filename: "absence_v2.csv".to_string(),
                subject_id: Some(replacement.id()),
                replaced_by_id: None,
                replacing_id: Some(original_file_id),
                created: Utc::now(),
            })
            .await;
        content
            .insert_release_file(ReleaseFile {
                release_version_id,
                file_id: original_file_id,
                name: Some("Pupil absence".to_string()),
                summary: Some("Sessions missed through absence".to_string()),
                order: 2,
                public_api_data_set_id: None,
                public_api_data_set_version: None,
            })
            .await;
        content
            .insert_release_file(ReleaseFile {
                release_version_id,
                file_id: replacement_file_id,
                name: None,
                summary: None,
                order: 0,
                public_api_data_set_id: None,
                public_api_data_set_version: None,
            })
            .await;

        Self {
            release_version_id,
            original_file_id,
            replacement_file_id,
            statistics,
            content,
            data_sets,
        }
    }

    pub fn service(&self) -> ReplacementService {
        ReplacementService::new(
            self.statistics.clone(),
            self.content.clone(),
            self.data_sets.clone(),
            Arc::new(StoreFileRemover::new(
                self.statistics.clone(),
                self.content.clone(),
            )),
        )
    }

    pub fn write_count(&self) -> usize {
        self.statistics.write_count() + self.content.write_count()
    }
}

/// "gender" {Male, Female} and two absence indicators, over England and Sheffield
pub(crate) fn absence_subject() -> SubjectBuilder {
    SubjectBuilder::new("Absence by characteristic")
        .filter("gender", "Gender", vec![("Total", vec!["Male", "Female"])])
        .indicator_group("Absence fields", vec!["sess_authorised", "sess_unauthorised"])
        .location(GeographicLevel::Country, "E92000001", "England")
        .location(GeographicLevel::LocalAuthority, "E08000019", "Sheffield")
        .time_periods(vec![(2020, "AY"), (2021, "AY")])
}

/// Same structure as `absence_subject`, fresh ids, plus an "Other" gender item.
/// England keeps its id; Sheffield is re-issued under the same code.
pub(crate) fn absence_replacement(original: &SubjectBuilder) -> SubjectBuilder {
    SubjectBuilder::new("Absence by characteristic (revised)")
        .filter("gender", "Gender", vec![("Total", vec!["Male", "Female", "Other"])])
        .indicator_group("Absence fields", vec!["sess_authorised", "sess_unauthorised"])
        .with_location(original.location_with_code("E92000001"))
        .location(GeographicLevel::LocalAuthority, "E08000019", "Sheffield")
        .time_periods(vec![(2020, "AY"), (2021, "AY")])
}
