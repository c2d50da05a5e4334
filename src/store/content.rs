//! Content Store
//!
//! Files, release versions, release-file links and data blocks.

use crate::error::{invariant_error, not_found_error, ReplacementError, ReplacementResult};
use crate::models::{DataBlock, File, ReleaseFile, ReleaseVersion};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Data block and release-file rewrites to persist as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentChangeSet {
    pub data_blocks: Vec<DataBlock>,
    pub release_files: Vec<ReleaseFile>,
}

impl ContentChangeSet {
    pub fn is_empty(&self) -> bool {
        self.data_blocks.is_empty() && self.release_files.is_empty()
    }
}

#[derive(Default)]
struct ContentState {
    files: HashMap<Uuid, File>,
    release_versions: HashMap<Uuid, ReleaseVersion>,
    /// (release version id, file id) -> link
    release_files: HashMap<(Uuid, Uuid), ReleaseFile>,
    data_blocks: HashMap<Uuid, DataBlock>,
}

/// Thread-safe content store
pub struct ContentStore {
    state: Arc<RwLock<ContentState>>,
    writes: AtomicUsize,
}

impl ContentStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ContentState::default())),
            writes: AtomicUsize::new(0),
        }
    }

    // ---- seeding (setup only, not counted as writes) ----

    pub async fn insert_file(&self, file: File) {
        self.state.write().await.files.insert(file.id, file);
    }

    pub async fn insert_release_version(&self, release_version: ReleaseVersion) {
        self.state
            .write()
            .await
            .release_versions
            .insert(release_version.id, release_version);
    }

    pub async fn insert_release_file(&self, release_file: ReleaseFile) {
        self.state.write().await.release_files.insert(
            (release_file.release_version_id, release_file.file_id),
            release_file,
        );
    }

    pub async fn insert_data_block(&self, data_block: DataBlock) {
        self.state
            .write()
            .await
            .data_blocks
            .insert(data_block.id, data_block);
    }

    // ---- reads ----

    pub async fn get_file(&self, file_id: Uuid) -> ReplacementResult<File> {
        let state = self.state.read().await;
        state
            .files
            .get(&file_id)
            .cloned()
            .ok_or_else(|| not_found_error(format!("File {} not found", file_id)))
    }

    pub async fn get_release_version(&self, release_version_id: Uuid) -> ReplacementResult<ReleaseVersion> {
        let state = self.state.read().await;
        state
            .release_versions
            .get(&release_version_id)
            .cloned()
            .ok_or_else(|| {
                not_found_error(format!("Release version {} not found", release_version_id))
            })
    }

    pub async fn get_release_file(
        &self,
        release_version_id: Uuid,
        file_id: Uuid,
    ) -> ReplacementResult<ReleaseFile> {
        let state = self.state.read().await;
        state
            .release_files
            .get(&(release_version_id, file_id))
            .cloned()
            .ok_or_else(|| {
                not_found_error(format!(
                    "File {} is not linked to release version {}",
                    file_id, release_version_id
                ))
            })
    }

    /// Every release-file link for a file
    pub async fn release_files_for_file(&self, file_id: Uuid) -> Vec<ReleaseFile> {
        let state = self.state.read().await;
        let mut links: Vec<ReleaseFile> = state
            .release_files
            .values()
            .filter(|rf| rf.file_id == file_id)
            .cloned()
            .collect();
        links.sort_by_key(|rf| rf.release_version_id);
        links
    }

    /// Data blocks of a release version whose query targets the given subject
    pub async fn data_blocks_for_subject(
        &self,
        release_version_id: Uuid,
        subject_id: Uuid,
    ) -> Vec<DataBlock> {
        let state = self.state.read().await;
        let mut blocks: Vec<DataBlock> = state
            .data_blocks
            .values()
            .filter(|db| db.release_version_id == release_version_id)
            .filter(|db| db.query.subject_id == subject_id)
            .cloned()
            .collect();
        blocks.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        blocks
    }

    pub async fn get_data_block(&self, data_block_id: Uuid) -> ReplacementResult<DataBlock> {
        let state = self.state.read().await;
        state
            .data_blocks
            .get(&data_block_id)
            .cloned()
            .ok_or_else(|| not_found_error(format!("Data block {} not found", data_block_id)))
    }

    // ---- writes ----

    /// Persist a change set atomically. Nothing is written if any target is unknown.
    pub async fn commit(&self, changes: ContentChangeSet) -> ReplacementResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;

        if let Some(missing) = changes
            .data_blocks
            .iter()
            .find(|db| !state.data_blocks.contains_key(&db.id))
        {
            return Err(ReplacementError::Storage(format!(
                "Cannot update data block {}: it does not exist",
                missing.id
            )));
        }
        if let Some(missing) = changes
            .release_files
            .iter()
            .find(|rf| !state.release_files.contains_key(&(rf.release_version_id, rf.file_id)))
        {
            return Err(ReplacementError::Storage(format!(
                "Cannot update release file link for file {}: it does not exist",
                missing.file_id
            )));
        }

        let (block_count, link_count) = (changes.data_blocks.len(), changes.release_files.len());
        for data_block in changes.data_blocks {
            state.data_blocks.insert(data_block.id, data_block);
        }
        for release_file in changes.release_files {
            state.release_files.insert(
                (release_file.release_version_id, release_file.file_id),
                release_file,
            );
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            "Committed content change set: {} data blocks, {} release files updated",
            block_count,
            link_count
        );
        Ok(())
    }

    /// Clear the bidirectional replacement link between two files.
    ///
    /// Both sides must point at each other, otherwise stored state is corrupt.
    pub async fn clear_replacement_link(
        &self,
        original_file_id: Uuid,
        replacement_file_id: Uuid,
    ) -> ReplacementResult<()> {
        let mut state = self.state.write().await;

        let original_link = state
            .files
            .get(&original_file_id)
            .ok_or_else(|| not_found_error(format!("File {} not found", original_file_id)))?
            .replaced_by_id;
        let replacement_link = state
            .files
            .get(&replacement_file_id)
            .ok_or_else(|| not_found_error(format!("File {} not found", replacement_file_id)))?
            .replacing_id;

        if original_link != Some(replacement_file_id) {
            return Err(invariant_error(format!(
                "Original file {} is recorded as replaced by {:?}, expected {}",
                original_file_id, original_link, replacement_file_id
            )));
        }
        if replacement_link != Some(original_file_id) {
            return Err(invariant_error(format!(
                "Replacement file {} is recorded as replacing {:?}, expected {}",
                replacement_file_id, replacement_link, original_file_id
            )));
        }

        if let Some(original) = state.files.get_mut(&original_file_id) {
            original.replaced_by_id = None;
        }
        if let Some(replacement) = state.files.get_mut(&replacement_file_id) {
            replacement.replacing_id = None;
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            "Cleared replacement link between files {} and {}",
            original_file_id,
            replacement_file_id
        );
        Ok(())
    }

    /// Remove a release-file link, returning how many links the file still has
    pub async fn remove_release_file(
        &self,
        release_version_id: Uuid,
        file_id: Uuid,
    ) -> ReplacementResult<usize> {
        let mut state = self.state.write().await;
        state
            .release_files
            .remove(&(release_version_id, file_id))
            .ok_or_else(|| {
                not_found_error(format!(
                    "File {} is not linked to release version {}",
                    file_id, release_version_id
                ))
            })?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(state
            .release_files
            .keys()
            .filter(|(_, f)| *f == file_id)
            .count())
    }

    pub async fn remove_file(&self, file_id: Uuid) -> ReplacementResult<File> {
        let mut state = self.state.write().await;
        let file = state
            .files
            .remove(&file_id)
            .ok_or_else(|| not_found_error(format!("File {} not found", file_id)))?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(file)
    }

    /// Number of persisted writes since creation
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    // ---- export ----

    pub async fn all_files(&self) -> Vec<File> {
        let state = self.state.read().await;
        let mut list: Vec<_> = state.files.values().cloned().collect();
        list.sort_by_key(|f| f.id);
        list
    }

    pub async fn all_release_versions(&self) -> Vec<ReleaseVersion> {
        let state = self.state.read().await;
        let mut list: Vec<_> = state.release_versions.values().cloned().collect();
        list.sort_by_key(|rv| rv.id);
        list
    }

    pub async fn all_release_files(&self) -> Vec<ReleaseFile> {
        let state = self.state.read().await;
        let mut list: Vec<_> = state.release_files.values().cloned().collect();
        list.sort_by_key(|rf| (rf.release_version_id, rf.file_id));
        list
    }

    pub async fn all_data_blocks(&self) -> Vec<DataBlock> {
        let state = self.state.read().await;
        let mut list: Vec<_> = state.data_blocks.values().cloned().collect();
        list.sort_by_key(|db| db.id);
        list
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}
