//! Plan Applier
//!
//! Rewrites every reference recorded in a valid plan from original ids to
//! replacement ids, then retires the original file.
//!
//! All rewrites are computed before the first write, so a plan that fails
//! to resolve leaves the stores untouched. Writes then happen in order:
//! footnotes, data blocks and the replacement release file, the file link,
//! and finally removal of the original file and subject.

use crate::error::{invariant_error, ReplacementResult};
use crate::models::{AxisType, ChartDataSet, DataBlock, Footnote, TableHeader, TableHeaderType};
use crate::replacement::plan::{DataBlockReplacementPlan, FootnoteReplacementPlan, ReplacementPlan};
use crate::replacement::service::ReplacementFiles;
use crate::store::{ContentChangeSet, ContentStore, FileRemover, StatisticsChangeSet, StatisticsStore};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

pub struct PlanApplier<'a> {
    statistics: &'a StatisticsStore,
    content: &'a ContentStore,
    file_remover: &'a dyn FileRemover,
}

impl<'a> PlanApplier<'a> {
    pub fn new(
        statistics: &'a StatisticsStore,
        content: &'a ContentStore,
        file_remover: &'a dyn FileRemover,
    ) -> Self {
        Self {
            statistics,
            content,
            file_remover,
        }
    }

    pub async fn apply(&self, plan: &ReplacementPlan, files: &ReplacementFiles) -> ReplacementResult<()> {
        if !plan.valid {
            return Err(invariant_error(format!(
                "Refusing to apply an invalid plan for subject {}",
                plan.original_subject_id
            )));
        }

        let mut statistics_changes = StatisticsChangeSet::default();
        for footnote_plan in &plan.footnotes {
            let mut footnote = self.statistics.get_footnote(footnote_plan.id).await?;
            rewrite_footnote(
                &mut footnote,
                footnote_plan,
                plan.original_subject_id,
                plan.replacement_subject_id,
            )?;
            statistics_changes.footnotes.push(footnote);
        }

        let mut content_changes = ContentChangeSet::default();
        for block_plan in &plan.data_blocks {
            let mut data_block = self.content.get_data_block(block_plan.id).await?;
            rewrite_data_block(&mut data_block, block_plan, plan.replacement_subject_id)?;
            content_changes.data_blocks.push(data_block);
        }

        let original_link = self
            .content
            .get_release_file(files.release_version_id, files.original.id)
            .await?;
        let mut replacement_link = self
            .content
            .get_release_file(files.release_version_id, files.replacement.id)
            .await?;
        if original_link.summary.is_some() {
            replacement_link.summary = original_link.summary;
        }
        if original_link.name.is_some() {
            replacement_link.name = original_link.name;
        }
        replacement_link.order = original_link.order;
        content_changes.release_files.push(replacement_link);

        self.check_link(files).await?;

        self.statistics.commit(statistics_changes).await?;
        self.content.commit(content_changes).await?;

        self.content
            .clear_replacement_link(files.original.id, files.replacement.id)
            .await?;
        self.file_remover
            .remove_original_file_and_subject(files.release_version_id, files.original.id)
            .await?;

        tracing::info!(
            "Replaced file {} with {}: {} data blocks and {} footnotes repointed to subject {}",
            files.original.id,
            files.replacement.id,
            plan.data_blocks.len(),
            plan.footnotes.len(),
            plan.replacement_subject_id
        );
        Ok(())
    }

    /// The stored files must still point at each other
    async fn check_link(&self, files: &ReplacementFiles) -> ReplacementResult<()> {
        let original = self.content.get_file(files.original.id).await?;
        let replacement = self.content.get_file(files.replacement.id).await?;

        if original.replaced_by_id != Some(replacement.id) || replacement.replacing_id != Some(original.id) {
            return Err(invariant_error(format!(
                "Files {} and {} are no longer linked as original and replacement",
                original.id, replacement.id
            )));
        }
        Ok(())
    }
}

/// Turn plan targets into a rewrite map. A missing target here means the
/// validity gate was bypassed.
fn resolved(
    targets: HashMap<Uuid, Option<Uuid>>,
    kind: &str,
    owner: &str,
) -> ReplacementResult<HashMap<Uuid, Uuid>> {
    targets
        .into_iter()
        .map(|(id, target)| {
            target
                .map(|target| (id, target))
                .ok_or_else(|| invariant_error(format!("{} {} in {} has no replacement", kind, id, owner)))
        })
        .collect()
}

/// Remove every mapped id first, then insert the targets, so a target that
/// is also a mapped original cannot be dropped.
fn replace_ids(ids: &mut BTreeSet<Uuid>, mapping: &HashMap<Uuid, Uuid>) {
    let removed: Vec<Uuid> = mapping.keys().copied().filter(|id| ids.remove(id)).collect();
    ids.extend(removed.iter().filter_map(|id| mapping.get(id)));
}

/// Join rows are keyed by the linked id, so a repointed link is a delete
/// of the original row plus an insert for the target.
fn replace_joins(joins: &mut Vec<Uuid>, mapping: &HashMap<Uuid, Uuid>) {
    let targets: Vec<Uuid> = joins.iter().filter_map(|id| mapping.get(id)).copied().collect();
    joins.retain(|id| !mapping.contains_key(id));
    for target in targets {
        if !joins.contains(&target) {
            joins.push(target);
        }
    }
}

struct DataBlockRewrites {
    owner: String,
    filter_items: HashMap<Uuid, Uuid>,
    indicators: HashMap<Uuid, Uuid>,
    locations: HashMap<Uuid, Uuid>,
}

impl DataBlockRewrites {
    fn header(&self, cell: &mut TableHeader) -> ReplacementResult<()> {
        let mapping = match cell.header_type {
            TableHeaderType::Filter => &self.filter_items,
            TableHeaderType::Indicator => &self.indicators,
            TableHeaderType::Location => &self.locations,
            TableHeaderType::TimePeriod => return Ok(()),
        };

        match cell.value.parse::<Uuid>().ok().and_then(|id| mapping.get(&id)) {
            Some(target) => cell.value = target.to_string(),
            // Locations outside the query are kept as they are
            None if cell.header_type == TableHeaderType::Location => {}
            None => {
                return Err(invariant_error(format!(
                    "{:?} header '{}' in {} has no replacement",
                    cell.header_type, cell.value, self.owner
                )))
            }
        }
        Ok(())
    }

    fn chart_data_set(&self, data_set: &mut ChartDataSet) -> ReplacementResult<()> {
        data_set.filters = data_set
            .filters
            .iter()
            .map(|id| {
                self.filter_items.get(id).copied().ok_or_else(|| {
                    invariant_error(format!("Chart filter item {} in {} has no replacement", id, self.owner))
                })
            })
            .collect::<ReplacementResult<Vec<_>>>()?;

        data_set.indicator = self
            .indicators
            .get(&data_set.indicator)
            .copied()
            .ok_or_else(|| {
                invariant_error(format!(
                    "Chart indicator {} in {} has no replacement",
                    data_set.indicator, self.owner
                ))
            })?;

        if let Some(location) = &mut data_set.location {
            if let Some(target) = self.locations.get(&location.value) {
                location.value = *target;
            }
        }
        Ok(())
    }
}

/// Repoint a data block's query, table headers and charts at the replacement subject
pub(crate) fn rewrite_data_block(
    data_block: &mut DataBlock,
    plan: &DataBlockReplacementPlan,
    replacement_subject_id: Uuid,
) -> ReplacementResult<()> {
    let owner = format!("data block {}", data_block.id);
    let rewrites = DataBlockRewrites {
        filter_items: resolved(plan.filter_item_targets(), "Filter item", &owner)?,
        indicators: resolved(plan.indicator_targets(), "Indicator", &owner)?,
        locations: resolved(plan.location_targets(), "Location", &owner)?,
        owner,
    };

    let query = &mut data_block.query;
    query.subject_id = replacement_subject_id;
    replace_ids(&mut query.filters, &rewrites.filter_items);
    replace_ids(&mut query.indicators, &rewrites.indicators);
    replace_ids(&mut query.location_ids, &rewrites.locations);

    for cell in data_block.table.table_headers.cells_mut() {
        rewrites.header(cell)?;
    }

    for chart in &mut data_block.charts {
        if let Some(legend) = &mut chart.legend {
            for item in &mut legend.items {
                rewrites.chart_data_set(&mut item.data_set)?;
            }
        }
        if let Some(axis) = chart.axes.get_mut(&AxisType::Major) {
            for data_set in &mut axis.data_sets {
                rewrites.chart_data_set(data_set)?;
            }
        }
    }

    tracing::debug!("Rewrote data block '{}' ({})", data_block.name, data_block.id);
    Ok(())
}

/// Repoint a footnote's subject and entity links
pub(crate) fn rewrite_footnote(
    footnote: &mut Footnote,
    plan: &FootnoteReplacementPlan,
    original_subject_id: Uuid,
    replacement_subject_id: Uuid,
) -> ReplacementResult<()> {
    let owner = format!("footnote {}", footnote.id);

    replace_joins(
        &mut footnote.subjects,
        &HashMap::from([(original_subject_id, replacement_subject_id)]),
    );
    replace_joins(&mut footnote.filters, &resolved(plan.filter_targets(), "Filter", &owner)?);
    replace_joins(
        &mut footnote.filter_groups,
        &resolved(plan.filter_group_targets(), "Filter group", &owner)?,
    );
    replace_joins(
        &mut footnote.filter_items,
        &resolved(plan.filter_item_targets(), "Filter item", &owner)?,
    );
    replace_joins(
        &mut footnote.indicators,
        &resolved(plan.indicator_targets(), "Indicator", &owner)?,
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label_order::NaturalOrder;
    use crate::replacement::builder::{PlanBuilder, PlanInputs};
    use crate::test_support::{absence_replacement, absence_subject, footnote};
    use pretty_assertions::assert_eq;

    fn plan_for(
        original: &crate::test_support::SubjectBuilder,
        replacement: &crate::test_support::SubjectBuilder,
        data_blocks: &[DataBlock],
        footnotes: &[Footnote],
    ) -> ReplacementPlan {
        let original_meta = original.meta();
        let replacement_meta = replacement.meta();
        PlanBuilder::new(&NaturalOrder)
            .build(&PlanInputs {
                original: &original_meta,
                replacement: &replacement_meta,
                data_blocks,
                footnotes,
                linked_data_set: None,
            })
            .unwrap()
    }

    #[test]
    fn test_replace_ids_handles_overlapping_targets() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut ids = BTreeSet::from([a, b]);
        replace_ids(&mut ids, &HashMap::from([(a, b), (b, c)]));

        assert_eq!(ids, BTreeSet::from([b, c]));
    }

    #[test]
    fn test_rewrite_data_block() {
        let original = absence_subject();
        let replacement = absence_replacement(&original);
        let mut block = original.data_block(
            Uuid::new_v4(),
            "Absence by gender",
            vec![
                original.item_id("gender", "Total", "Male"),
                original.item_id("gender", "Total", "Female"),
            ],
            vec![original.indicator_id("sess_authorised")],
            vec![
                original.location_with_code("E92000001").id,
                original.location_with_code("E08000019").id,
            ],
        );
        let plan = plan_for(&original, &replacement, std::slice::from_ref(&block), &[]);

        rewrite_data_block(&mut block, &plan.data_blocks[0], replacement.id()).unwrap();

        let male = replacement.item_id("gender", "Total", "Male");
        let female = replacement.item_id("gender", "Total", "Female");
        let indicator = replacement.indicator_id("sess_authorised");
        let sheffield = replacement.location_with_code("E08000019").id;
        let england = original.location_with_code("E92000001").id;

        assert_eq!(block.query.subject_id, replacement.id());
        assert_eq!(block.query.filters, BTreeSet::from([male, female]));
        assert_eq!(block.query.indicators, BTreeSet::from([indicator]));
        assert_eq!(block.query.location_ids, BTreeSet::from([england, sheffield]));

        let headers = &block.table.table_headers;
        let columns: Vec<String> = headers.columns.iter().map(|h| h.value.clone()).collect();
        assert_eq!(columns, vec![male.to_string(), female.to_string()]);
        assert_eq!(headers.rows[0].value, indicator.to_string());
        assert_eq!(headers.row_groups[0][1].value, sheffield.to_string());
        assert_eq!(headers.column_groups[0][0].value, "2020_AY");

        let axis = &block.charts[0].axes[&AxisType::Major];
        assert_eq!(axis.data_sets[0].filters, vec![male]);
        assert_eq!(axis.data_sets[0].indicator, indicator);
        let legend = block.charts[0].legend.as_ref().unwrap();
        assert_eq!(legend.items[1].data_set.filters, vec![female]);
    }

    #[test]
    fn test_unresolved_filter_header_is_fatal() {
        let original = absence_subject();
        let replacement = absence_replacement(&original);
        let mut block = original.data_block(
            Uuid::new_v4(),
            "Absence by gender",
            vec![original.item_id("gender", "Total", "Male")],
            vec![original.indicator_id("sess_authorised")],
            vec![original.location_with_code("E92000001").id],
        );
        let plan = plan_for(&original, &replacement, std::slice::from_ref(&block), &[]);

        // A header the query does not select
        block.table.table_headers.columns.push(TableHeader::new(
            TableHeaderType::Filter,
            original.item_id("gender", "Total", "Female"),
        ));

        let err = rewrite_data_block(&mut block, &plan.data_blocks[0], replacement.id()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unresolved_chart_indicator_is_fatal() {
        let original = absence_subject();
        let replacement = absence_replacement(&original);
        let mut block = original.data_block(
            Uuid::new_v4(),
            "Absence by gender",
            vec![original.item_id("gender", "Total", "Male")],
            vec![original.indicator_id("sess_authorised")],
            vec![original.location_with_code("E92000001").id],
        );
        let plan = plan_for(&original, &replacement, std::slice::from_ref(&block), &[]);

        // A chart series plotting an indicator outside the query
        let unauthorised = original.indicator_id("sess_unauthorised");
        let axis = block.charts[0].axes.get_mut(&AxisType::Major).unwrap();
        axis.data_sets[0].indicator = unauthorised;

        let err = rewrite_data_block(&mut block, &plan.data_blocks[0], replacement.id()).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains(&unauthorised.to_string()));
    }

    #[test]
    fn test_unmapped_chart_location_is_kept() {
        let original = absence_subject();
        let replacement = absence_replacement(&original);
        let mut block = original.data_block(
            Uuid::new_v4(),
            "Absence in England",
            vec![original.item_id("gender", "Total", "Female")],
            vec![original.indicator_id("sess_authorised")],
            vec![original.location_with_code("E92000001").id],
        );
        let plan = plan_for(&original, &replacement, std::slice::from_ref(&block), &[]);

        let elsewhere = Uuid::new_v4();
        let legend = block.charts[0].legend.as_mut().unwrap();
        if let Some(location) = &mut legend.items[0].data_set.location {
            location.value = elsewhere;
        }

        rewrite_data_block(&mut block, &plan.data_blocks[0], replacement.id()).unwrap();

        let legend = block.charts[0].legend.as_ref().unwrap();
        let data_set = &legend.items[0].data_set;
        assert_eq!(data_set.location.as_ref().map(|l| l.value), Some(elsewhere));
        assert_eq!(data_set.indicator, replacement.indicator_id("sess_authorised"));
    }

    #[test]
    fn test_rewrite_footnote_keeps_unrelated_links() {
        let release_version_id = Uuid::new_v4();
        let original = absence_subject();
        let replacement = absence_replacement(&original);
        let other_subject = Uuid::new_v4();

        let mut note = footnote(release_version_id, "Applies to both files");
        note.subjects = vec![original.id(), other_subject];
        note.filter_items = vec![original.item_id("gender", "Total", "Male")];
        let plan = plan_for(&original, &replacement, &[], std::slice::from_ref(&note));

        rewrite_footnote(&mut note, &plan.footnotes[0], original.id(), replacement.id()).unwrap();

        assert_eq!(note.subjects, vec![other_subject, replacement.id()]);
        assert_eq!(note.filter_items, vec![replacement.item_id("gender", "Total", "Male")]);
    }
}
