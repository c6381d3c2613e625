//! In-memory archive store.

use dashmap::DashMap;

use super::error::{ArchiveError, ArchiveResult};
use super::store::{ArchiveStore, ResourceHistory, ResourceSummary, VersionRecord};
use crate::types::ResourceId;

/// Keeps history in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    histories: DashMap<ResourceId, ResourceHistory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArchiveStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn current_version(&self, resource: &ResourceId) -> ArchiveResult<u64> {
        Ok(self
            .histories
            .get(resource)
            .map_or(0, |history| history.current_version))
    }

    fn append(&self, record: &VersionRecord) -> ArchiveResult<()> {
        let mut history = self
            .histories
            .entry(record.resource_id.clone())
            .or_insert_with(|| {
                ResourceHistory::new(record.resource_id.clone(), record.created_at)
            });

        history
            .push(record.clone())
            .map_err(|reason| ArchiveError::write_failed(&record.resource_id, reason))
    }

    fn query(&self, resource: &ResourceId) -> ArchiveResult<Vec<VersionRecord>> {
        Ok(self
            .histories
            .get(resource)
            .map(|history| history.versions.clone())
            .unwrap_or_default())
    }

    fn delete_versions(&self, resource: &ResourceId) -> ArchiveResult<usize> {
        Ok(self
            .histories
            .get_mut(resource)
            .map_or(0, |mut history| std::mem::take(&mut history.versions).len()))
    }

    fn resources(&self) -> ArchiveResult<Vec<ResourceSummary>> {
        let mut summaries: Vec<ResourceSummary> = self
            .histories
            .iter()
            .map(|history| ResourceSummary::from(history.value()))
            .collect();
        summaries.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        Ok(summaries)
    }
}
