//! Storage contract for version records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ArchiveResult;
use crate::types::{Record, ResourceId};

/// One archived change of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub resource_id: ResourceId,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub added: Vec<Record>,
    pub removed: Vec<Record>,
}

/// Everything archived for one resource.
///
/// `current_version` is the counter of the last archived change. It
/// survives deletion of the records themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHistory {
    pub resource_id: ResourceId,
    pub created_at: DateTime<Utc>,
    pub current_version: u64,
    pub versions: Vec<VersionRecord>,
}

impl ResourceHistory {
    pub fn new(resource_id: ResourceId, created_at: DateTime<Utc>) -> Self {
        Self {
            resource_id,
            created_at,
            current_version: 0,
            versions: Vec::new(),
        }
    }

    /// Add `record` as the next version.
    ///
    /// Returns a description of the problem if `record` does not directly
    /// follow the current counter.
    pub(crate) fn push(&mut self, record: VersionRecord) -> Result<(), String> {
        if record.version != self.current_version + 1 {
            return Err(format!(
                "version {} does not follow current version {}",
                record.version, self.current_version
            ));
        }
        self.current_version = record.version;
        self.versions.push(record);
        Ok(())
    }
}

/// Summary of an archived resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub resource_id: ResourceId,
    pub created_at: DateTime<Utc>,
    pub current_version: u64,
    pub stored_versions: usize,
}

impl From<&ResourceHistory> for ResourceSummary {
    fn from(history: &ResourceHistory) -> Self {
        Self {
            resource_id: history.resource_id.clone(),
            created_at: history.created_at,
            current_version: history.current_version,
            stored_versions: history.versions.len(),
        }
    }
}

/// Persistent storage for version records.
///
/// `append` must store the record and advance the resource's counter as
/// one unit: when it returns an error, neither change is visible.
/// Callers serialize `append` calls per resource.
pub trait ArchiveStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &str;

    /// Counter of the last archived change, 0 if none.
    fn current_version(&self, resource: &ResourceId) -> ArchiveResult<u64>;

    /// Store `record` and set the counter to its version.
    fn append(&self, record: &VersionRecord) -> ArchiveResult<()>;

    /// Stored records for `resource`, by ascending version.
    fn query(&self, resource: &ResourceId) -> ArchiveResult<Vec<VersionRecord>>;

    /// Remove all stored records for `resource`, keeping its counter.
    /// Returns how many records were removed.
    fn delete_versions(&self, resource: &ResourceId) -> ArchiveResult<usize>;

    /// All resources with archived history, sorted by resource.
    fn resources(&self) -> ArchiveResult<Vec<ResourceSummary>>;
}
