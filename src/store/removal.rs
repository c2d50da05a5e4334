//! Removal of a replaced data file and its subject

use crate::error::ReplacementResult;
use crate::store::{ContentStore, FileRemover, StatisticsStore};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// File remover backed by the in-memory stores
pub struct StoreFileRemover {
    statistics: Arc<StatisticsStore>,
    content: Arc<ContentStore>,
}

impl StoreFileRemover {
    pub fn new(statistics: Arc<StatisticsStore>, content: Arc<ContentStore>) -> Self {
        Self {
            statistics,
            content,
        }
    }
}

#[async_trait]
impl FileRemover for StoreFileRemover {
    async fn remove_original_file_and_subject(
        &self,
        release_version_id: Uuid,
        file_id: Uuid,
    ) -> ReplacementResult<()> {
        let file = self.content.get_file(file_id).await?;
        let remaining_links = self
            .content
            .remove_release_file(release_version_id, file_id)
            .await?;

        // Earlier release versions still publish this file
        if remaining_links > 0 {
            tracing::info!(
                "File {} unlinked from release version {}, still linked to {} other versions",
                file_id,
                release_version_id,
                remaining_links
            );
            return Ok(());
        }

        self.content.remove_file(file_id).await?;
        if let Some(subject_id) = file.subject_id {
            if self.statistics.subject_exists(subject_id).await {
                self.statistics.remove_subject(subject_id).await?;
            }
        }

        tracing::info!(
            "Removed file {} ({}) and its subject {:?}",
            file_id,
            file.filename,
            file.subject_id
        );
        Ok(())
    }
}
