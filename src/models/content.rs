//! Content-domain types
//!
//! Files, release versions and the published content that references a
//! subject's metadata by id: data block queries, table headers and charts.

use crate::models::statistics::{GeographicLevel, TimePeriod};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileType {
    Data,
    Metadata,
    Ancillary,
    Chart,
    Image,
    DataZip,
    BulkDataZip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub filename: String,
    /// Set for data files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacing_id: Option<Uuid>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseVersion {
    pub id: Uuid,
    pub release_id: Uuid,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

/// Link between a release version and a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseFile {
    pub release_version_id: Uuid,
    pub file_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Curator-authored meta guidance for the data file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_api_data_set_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_api_data_set_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePeriodQuery {
    pub start: TimePeriod,
    pub end: TimePeriod,
}

/// A saved table query against one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTableQuery {
    pub subject_id: Uuid,
    #[serde(default)]
    pub filters: BTreeSet<Uuid>,
    #[serde(default)]
    pub indicators: BTreeSet<Uuid>,
    #[serde(default)]
    pub location_ids: BTreeSet<Uuid>,
    pub time_period: TimePeriodQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TableHeaderType {
    Filter,
    Indicator,
    Location,
    TimePeriod,
}

/// A single header cell. `value` is a stringified id, or a time period key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableHeader {
    #[serde(rename = "type")]
    pub header_type: TableHeaderType,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<GeographicLevel>,
}

impl TableHeader {
    pub fn new(header_type: TableHeaderType, value: impl ToString) -> Self {
        Self {
            header_type,
            value: value.to_string(),
            level: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableHeaders {
    #[serde(default)]
    pub column_groups: Vec<Vec<TableHeader>>,
    #[serde(default)]
    pub columns: Vec<TableHeader>,
    #[serde(default)]
    pub row_groups: Vec<Vec<TableHeader>>,
    #[serde(default)]
    pub rows: Vec<TableHeader>,
}

impl TableHeaders {
    /// Every cell across rows, columns and all row and column groups
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut TableHeader> {
        self.column_groups
            .iter_mut()
            .flatten()
            .chain(self.columns.iter_mut())
            .chain(self.row_groups.iter_mut().flatten())
            .chain(self.rows.iter_mut())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfiguration {
    pub table_headers: TableHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataSetLocation {
    pub level: GeographicLevel,
    pub value: Uuid,
}

/// Filter-item ids plus one indicator, shared by legend items and axis series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataSet {
    #[serde(default)]
    pub filters: Vec<Uuid>,
    pub indicator: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ChartDataSetLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartLegendItem {
    pub data_set: ChartDataSet,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartLegend {
    #[serde(default)]
    pub items: Vec<ChartLegendItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Major,
    Minor,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartAxis {
    #[serde(default)]
    pub data_sets: Vec<ChartDataSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    HorizontalBar,
    VerticalBar,
    Map,
    Infographic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<ChartLegend>,
    #[serde(default)]
    pub axes: BTreeMap<AxisType, ChartAxis>,
}

/// A saved table/chart configuration embedded in release content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBlock {
    pub id: Uuid,
    pub release_version_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub query: FullTableQuery,
    #[serde(default)]
    pub table: TableConfiguration,
    #[serde(default)]
    pub charts: Vec<Chart>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_mut_visits_every_cell() {
        let cell = |v: &str| TableHeader::new(TableHeaderType::Filter, v);
        let mut headers = TableHeaders {
            column_groups: vec![vec![cell("a"), cell("b")], vec![cell("c")]],
            columns: vec![cell("d")],
            row_groups: vec![vec![cell("e")]],
            rows: vec![cell("f"), cell("g")],
        };

        let values: Vec<String> = headers.cells_mut().map(|c| c.value.clone()).collect();
        assert_eq!(values, vec!["a", "b", "c", "d", "e", "f", "g"]);
    }

    #[test]
    fn test_table_header_serializes_type_field() {
        let header = TableHeader::new(TableHeaderType::TimePeriod, "2021_AY");
        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(json["type"], "timePeriod");
        assert_eq!(json["value"], "2021_AY");
        assert!(json.get("level").is_none());
    }
}
