//! Replacement Service
//!
//! Entry points for planning and performing a data file replacement.

use crate::error::{not_found_error, validation_error, ReplacementResult, ValidationErrorCode};
use crate::label_order::{LabelComparer, NaturalOrder};
use crate::meta::extract_subject_meta;
use crate::models::{File, FileType};
use crate::replacement::applier::PlanApplier;
use crate::replacement::builder::{LinkedDataSetVersion, PlanBuilder, PlanInputs};
use crate::replacement::plan::ReplacementPlan;
use crate::store::{ContentStore, DataSetVersionSource, FileRemover, StatisticsStore};
use std::sync::Arc;
use uuid::Uuid;

/// An original data file and its replacement, checked to be replaceable
#[derive(Debug, Clone)]
pub struct ReplacementFiles {
    pub release_version_id: Uuid,
    pub original: File,
    pub replacement: File,
    pub original_subject_id: Uuid,
    pub replacement_subject_id: Uuid,
}

pub struct ReplacementService {
    statistics: Arc<StatisticsStore>,
    content: Arc<ContentStore>,
    data_sets: Arc<dyn DataSetVersionSource>,
    file_remover: Arc<dyn FileRemover>,
    comparer: Arc<dyn LabelComparer>,
}

impl ReplacementService {
    pub fn new(
        statistics: Arc<StatisticsStore>,
        content: Arc<ContentStore>,
        data_sets: Arc<dyn DataSetVersionSource>,
        file_remover: Arc<dyn FileRemover>,
    ) -> Self {
        Self {
            statistics,
            content,
            data_sets,
            file_remover,
            comparer: Arc::new(NaturalOrder),
        }
    }

    /// Use a different ordering for plan presentation
    pub fn with_comparer(mut self, comparer: Arc<dyn LabelComparer>) -> Self {
        self.comparer = comparer;
        self
    }

    /// Build the replacement plan for a pair of data files. Never writes.
    pub async fn get_replacement_plan(
        &self,
        original_file_id: Uuid,
        replacement_file_id: Uuid,
    ) -> ReplacementResult<ReplacementPlan> {
        let files = self.validate_files(original_file_id, replacement_file_id).await?;
        self.build_plan(&files).await
    }

    /// Perform the replacement if, and only if, its plan is valid
    pub async fn replace(&self, original_file_id: Uuid, replacement_file_id: Uuid) -> ReplacementResult<()> {
        let files = self.validate_files(original_file_id, replacement_file_id).await?;
        let plan = self.build_plan(&files).await?;

        if !plan.valid {
            tracing::warn!(
                "Replacement of file {} by {} refused: {} sub-plans do not resolve",
                original_file_id,
                replacement_file_id,
                plan.invalid_count()
            );
            return Err(validation_error(ValidationErrorCode::ReplacementPlanNotValid));
        }

        PlanApplier::new(&self.statistics, &self.content, self.file_remover.as_ref())
            .apply(&plan, &files)
            .await
    }

    async fn validate_files(
        &self,
        original_file_id: Uuid,
        replacement_file_id: Uuid,
    ) -> ReplacementResult<ReplacementFiles> {
        let original = self.content.get_file(original_file_id).await?;
        let replacement = self.content.get_file(replacement_file_id).await?;

        if original.file_type != FileType::Data || replacement.file_type != FileType::Data {
            return Err(validation_error(ValidationErrorCode::FileTypeMustBeData));
        }

        let original_links = self.content.release_files_for_file(original.id).await;
        let release_version_id = self
            .content
            .release_files_for_file(replacement.id)
            .await
            .into_iter()
            .map(|rf| rf.release_version_id)
            .find(|rv| original_links.iter().any(|o| o.release_version_id == *rv))
            .ok_or_else(|| validation_error(ValidationErrorCode::FilesNotInSameRelease))?;
        self.content.get_release_version(release_version_id).await?;

        if original.replaced_by_id != Some(replacement.id) || replacement.replacing_id != Some(original.id) {
            return Err(validation_error(
                ValidationErrorCode::ReplacementFileNotLinkedToOriginal,
            ));
        }

        let original_subject_id = original
            .subject_id
            .ok_or_else(|| not_found_error(format!("File {} has no subject", original.id)))?;
        let replacement_subject_id = replacement
            .subject_id
            .ok_or_else(|| not_found_error(format!("File {} has no subject", replacement.id)))?;

        Ok(ReplacementFiles {
            release_version_id,
            original,
            replacement,
            original_subject_id,
            replacement_subject_id,
        })
    }

    async fn build_plan(&self, files: &ReplacementFiles) -> ReplacementResult<ReplacementPlan> {
        let original = extract_subject_meta(&self.statistics, files.original_subject_id).await?;
        let replacement = extract_subject_meta(&self.statistics, files.replacement_subject_id).await?;

        let data_blocks = self
            .content
            .data_blocks_for_subject(files.release_version_id, files.original_subject_id)
            .await;
        let footnotes = self
            .statistics
            .footnotes_for_release_version(files.release_version_id)
            .await;
        let linked_data_set = self.linked_data_set(files).await?;

        PlanBuilder::new(self.comparer.as_ref()).build(&PlanInputs {
            original: &original,
            replacement: &replacement,
            data_blocks: &data_blocks,
            footnotes: &footnotes,
            linked_data_set: linked_data_set.as_ref(),
        })
    }

    /// The API data set version published from the original file, if any
    async fn linked_data_set(&self, files: &ReplacementFiles) -> ReplacementResult<Option<LinkedDataSetVersion>> {
        let release_file = self
            .content
            .get_release_file(files.release_version_id, files.original.id)
            .await?;

        let (Some(data_set_id), Some(version)) = (
            release_file.public_api_data_set_id,
            release_file.public_api_data_set_version.as_deref(),
        ) else {
            return Ok(None);
        };

        let data_set_version = self
            .data_sets
            .get_data_set_version(data_set_id, version)
            .await?
            .ok_or_else(|| {
                not_found_error(format!(
                    "API data set {} version {} linked to file {} not found",
                    data_set_id, version, files.original.id
                ))
            })?;

        let mapping = self.data_sets.get_mapping_status(data_set_version.id).await?;
        Ok(Some(LinkedDataSetVersion {
            version: data_set_version,
            mapping,
        }))
    }
}
