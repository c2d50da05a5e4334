//! In-memory public API data set versions

use crate::error::ReplacementResult;
use crate::models::{DataSetVersion, MappingStatus, PublicVersion};
use crate::store::DataSetVersionSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryDataSetVersions {
    versions: Arc<RwLock<HashMap<Uuid, DataSetVersion>>>,
    /// Version id -> mapping status
    mappings: Arc<RwLock<HashMap<Uuid, MappingStatus>>>,
}

impl InMemoryDataSetVersions {
    pub fn new() -> Self {
        Self {
            versions: Arc::new(RwLock::new(HashMap::new())),
            mappings: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert_version(&self, version: DataSetVersion) {
        self.versions.write().await.insert(version.id, version);
    }

    pub async fn insert_mapping(&self, version_id: Uuid, status: MappingStatus) {
        self.mappings.write().await.insert(version_id, status);
    }

    pub async fn all_versions(&self) -> Vec<DataSetVersion> {
        let versions = self.versions.read().await;
        let mut list: Vec<_> = versions.values().cloned().collect();
        list.sort_by_key(|v| v.id);
        list
    }

    pub async fn all_mappings(&self) -> Vec<(Uuid, MappingStatus)> {
        let mappings = self.mappings.read().await;
        let mut list: Vec<_> = mappings.iter().map(|(id, m)| (*id, *m)).collect();
        list.sort_by_key(|(id, _)| *id);
        list
    }
}

impl Default for InMemoryDataSetVersions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSetVersionSource for InMemoryDataSetVersions {
    async fn get_data_set_version(
        &self,
        data_set_id: Uuid,
        version: &str,
    ) -> ReplacementResult<Option<DataSetVersion>> {
        // An unparseable version can never match a stored one
        let Ok(version) = version.parse::<PublicVersion>() else {
            tracing::warn!("Ignoring unparseable data set version '{}'", version);
            return Ok(None);
        };

        let versions = self.versions.read().await;
        Ok(versions
            .values()
            .find(|v| v.data_set_id == data_set_id && v.version == version)
            .cloned())
    }

    async fn get_mapping_status(&self, version_id: Uuid) -> ReplacementResult<Option<MappingStatus>> {
        Ok(self.mappings.read().await.get(&version_id).copied())
    }
}
