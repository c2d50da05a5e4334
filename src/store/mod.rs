//! Storage Module
//!
//! In-memory statistics and content stores, plus the collaborator contracts
//! the replacement core calls into:
//! - external (public API) data set versions and their mapping status
//! - the file lifecycle operation that removes a replaced file and its subject

pub mod content;
pub mod data_set;
pub mod removal;
pub mod snapshot;
pub mod statistics;

pub use content::{ContentChangeSet, ContentStore};
pub use data_set::InMemoryDataSetVersions;
pub use removal::StoreFileRemover;
pub use snapshot::StoreSnapshot;
pub use statistics::{StatisticsChangeSet, StatisticsStore, SubjectRecord};

use crate::error::ReplacementResult;
use crate::models::{DataSetVersion, MappingStatus};
use async_trait::async_trait;
use uuid::Uuid;

/// Read access to published API data set versions
#[async_trait]
pub trait DataSetVersionSource: Send + Sync {
    async fn get_data_set_version(
        &self,
        data_set_id: Uuid,
        version: &str,
    ) -> ReplacementResult<Option<DataSetVersion>>;

    /// `None` when the version was recreated rather than incrementally mapped
    async fn get_mapping_status(&self, version_id: Uuid) -> ReplacementResult<Option<MappingStatus>>;
}

/// File lifecycle operation used once every reference has been repointed
#[async_trait]
pub trait FileRemover: Send + Sync {
    async fn remove_original_file_and_subject(
        &self,
        release_version_id: Uuid,
        file_id: Uuid,
    ) -> ReplacementResult<()>;
}
