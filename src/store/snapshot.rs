//! Store Snapshot
//!
//! Serializable capture of every store, used to seed the in-memory stores
//! from a JSON fixture and to write the resulting state back out.

use crate::models::{DataBlock, DataSetVersion, File, Footnote, MappingStatus, ReleaseFile, ReleaseVersion};
use crate::store::{ContentStore, InMemoryDataSetVersions, StatisticsStore, SubjectRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRecord {
    pub data_set_version_id: Uuid,
    #[serde(flatten)]
    pub status: MappingStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub subjects: Vec<SubjectRecord>,
    #[serde(default)]
    pub footnotes: Vec<Footnote>,
    #[serde(default)]
    pub files: Vec<File>,
    #[serde(default)]
    pub release_versions: Vec<ReleaseVersion>,
    #[serde(default)]
    pub release_files: Vec<ReleaseFile>,
    #[serde(default)]
    pub data_blocks: Vec<DataBlock>,
    #[serde(default)]
    pub data_set_versions: Vec<DataSetVersion>,
    #[serde(default)]
    pub mappings: Vec<MappingRecord>,
}

impl StoreSnapshot {
    /// Seed the given stores with this snapshot
    pub async fn load_into(
        self,
        statistics: &StatisticsStore,
        content: &ContentStore,
        data_sets: &InMemoryDataSetVersions,
    ) {
        for subject in self.subjects {
            statistics.insert_subject(subject).await;
        }
        for footnote in self.footnotes {
            statistics.insert_footnote(footnote).await;
        }
        for file in self.files {
            content.insert_file(file).await;
        }
        for release_version in self.release_versions {
            content.insert_release_version(release_version).await;
        }
        for release_file in self.release_files {
            content.insert_release_file(release_file).await;
        }
        for data_block in self.data_blocks {
            content.insert_data_block(data_block).await;
        }
        for version in self.data_set_versions {
            data_sets.insert_version(version).await;
        }
        for mapping in self.mappings {
            data_sets
                .insert_mapping(mapping.data_set_version_id, mapping.status)
                .await;
        }
    }

    /// Capture the current contents of the given stores
    pub async fn capture(
        statistics: &StatisticsStore,
        content: &ContentStore,
        data_sets: &InMemoryDataSetVersions,
    ) -> Self {
        Self {
            subjects: statistics.all_subjects().await,
            footnotes: statistics.all_footnotes().await,
            files: content.all_files().await,
            release_versions: content.all_release_versions().await,
            release_files: content.all_release_files().await,
            data_blocks: content.all_data_blocks().await,
            data_set_versions: data_sets.all_versions().await,
            mappings: data_sets
                .all_mappings()
                .await
                .into_iter()
                .map(|(data_set_version_id, status)| MappingRecord {
                    data_set_version_id,
                    status,
                })
                .collect(),
        }
    }
}
