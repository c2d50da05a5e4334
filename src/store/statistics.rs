//! Statistics Store
//!
//! Subjects with their category metadata, and release footnotes.
//! Writes arrive as change sets and are applied under a single lock.

use crate::error::{not_found_error, ReplacementError, ReplacementResult};
use crate::models::{Filter, Footnote, IndicatorGroup, Location, Subject, TimePeriod};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A subject and everything it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub subject: Subject,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub indicator_groups: Vec<IndicatorGroup>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub time_periods: Vec<TimePeriod>,
}

/// Footnote rewrites to persist as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsChangeSet {
    pub footnotes: Vec<Footnote>,
}

impl StatisticsChangeSet {
    pub fn is_empty(&self) -> bool {
        self.footnotes.is_empty()
    }
}

/// Thread-safe statistics store
pub struct StatisticsStore {
    subjects: Arc<RwLock<HashMap<Uuid, SubjectRecord>>>,
    footnotes: Arc<RwLock<HashMap<Uuid, Footnote>>>,
    writes: AtomicUsize,
}

impl StatisticsStore {
    pub fn new() -> Self {
        Self {
            subjects: Arc::new(RwLock::new(HashMap::new())),
            footnotes: Arc::new(RwLock::new(HashMap::new())),
            writes: AtomicUsize::new(0),
        }
    }

    /// Seed a subject (setup only, not counted as a write)
    pub async fn insert_subject(&self, record: SubjectRecord) {
        let mut subjects = self.subjects.write().await;
        subjects.insert(record.subject.id, record);
    }

    /// Seed a footnote (setup only, not counted as a write)
    pub async fn insert_footnote(&self, footnote: Footnote) {
        let mut footnotes = self.footnotes.write().await;
        footnotes.insert(footnote.id, footnote);
    }

    pub async fn get_subject(&self, subject_id: Uuid) -> ReplacementResult<SubjectRecord> {
        let subjects = self.subjects.read().await;
        subjects
            .get(&subject_id)
            .cloned()
            .ok_or_else(|| not_found_error(format!("Subject {} not found", subject_id)))
    }

    pub async fn subject_exists(&self, subject_id: Uuid) -> bool {
        self.subjects.read().await.contains_key(&subject_id)
    }

    pub async fn get_footnote(&self, footnote_id: Uuid) -> ReplacementResult<Footnote> {
        let footnotes = self.footnotes.read().await;
        footnotes
            .get(&footnote_id)
            .cloned()
            .ok_or_else(|| not_found_error(format!("Footnote {} not found", footnote_id)))
    }

    /// Footnotes of a release version, in id order
    pub async fn footnotes_for_release_version(&self, release_version_id: Uuid) -> Vec<Footnote> {
        let footnotes = self.footnotes.read().await;
        let mut list: Vec<Footnote> = footnotes
            .values()
            .filter(|f| f.release_version_id == release_version_id)
            .cloned()
            .collect();
        list.sort_by_key(|f| f.id);
        list
    }

    /// Persist a change set atomically. Nothing is written if any footnote is unknown.
    pub async fn commit(&self, changes: StatisticsChangeSet) -> ReplacementResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut footnotes = self.footnotes.write().await;

        if let Some(missing) = changes
            .footnotes
            .iter()
            .find(|f| !footnotes.contains_key(&f.id))
        {
            return Err(ReplacementError::Storage(format!(
                "Cannot update footnote {}: it does not exist",
                missing.id
            )));
        }

        let count = changes.footnotes.len();
        for footnote in changes.footnotes {
            footnotes.insert(footnote.id, footnote);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        tracing::info!("Committed statistics change set: {} footnotes updated", count);
        Ok(())
    }

    /// Remove a subject and its metadata
    pub async fn remove_subject(&self, subject_id: Uuid) -> ReplacementResult<()> {
        let mut subjects = self.subjects.write().await;
        subjects
            .remove(&subject_id)
            .ok_or_else(|| not_found_error(format!("Subject {} not found", subject_id)))?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        tracing::info!("Removed subject {}", subject_id);
        Ok(())
    }

    /// Number of persisted writes since creation
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn all_subjects(&self) -> Vec<SubjectRecord> {
        let subjects = self.subjects.read().await;
        let mut list: Vec<_> = subjects.values().cloned().collect();
        list.sort_by_key(|s| s.subject.id);
        list
    }

    pub async fn all_footnotes(&self) -> Vec<Footnote> {
        let footnotes = self.footnotes.read().await;
        let mut list: Vec<_> = footnotes.values().cloned().collect();
        list.sort_by_key(|f| f.id);
        list
    }
}

impl Default for StatisticsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn footnote(release_version_id: Uuid) -> Footnote {
        Footnote {
            id: Uuid::new_v4(),
            release_version_id,
            content: "Figures are provisional".to_string(),
            subjects: vec![],
            filters: vec![],
            filter_groups: vec![],
            filter_items: vec![],
            indicators: vec![],
        }
    }

    #[tokio::test]
    async fn test_commit_rejects_unknown_footnote_without_writing() {
        let store = StatisticsStore::new();
        let release_version_id = Uuid::new_v4();
        let known = footnote(release_version_id);
        store.insert_footnote(known.clone()).await;

        let mut updated = known.clone();
        updated.content = "Changed".to_string();

        let result = store
            .commit(StatisticsChangeSet {
                footnotes: vec![updated, footnote(release_version_id)],
            })
            .await;

        assert!(matches!(result, Err(ReplacementError::Storage(_))));
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.get_footnote(known.id).await.unwrap(), known);
    }

    #[tokio::test]
    async fn test_footnotes_for_release_version() {
        let store = StatisticsStore::new();
        let release_version_id = Uuid::new_v4();
        store.insert_footnote(footnote(release_version_id)).await;
        store.insert_footnote(footnote(Uuid::new_v4())).await;

        let found = store.footnotes_for_release_version(release_version_id).await;
        assert_eq!(found.len(), 1);
    }
}
