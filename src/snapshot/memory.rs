//! In-memory snapshot reader.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{ReadError, SnapshotReader};
use crate::types::{Record, ResourceId, Snapshot};

#[derive(Debug, Clone)]
enum Content {
    Rows(Vec<Record>),
    Broken(String),
}

/// Serves resource content held in memory.
///
/// Content can be replaced at any time; each `read` returns what is held
/// at that moment. Resources can also be marked broken to simulate an
/// unreadable source.
#[derive(Debug, Default)]
pub struct MemoryReader {
    resources: RwLock<HashMap<ResourceId, Content>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content of a resource.
    pub fn set(&self, resource: impl Into<ResourceId>, records: Vec<Record>) {
        self.resources
            .write()
            .insert(resource.into(), Content::Rows(records));
    }

    /// Make subsequent reads of a resource fail with `reason`.
    pub fn break_resource(&self, resource: impl Into<ResourceId>, reason: impl Into<String>) {
        self.resources
            .write()
            .insert(resource.into(), Content::Broken(reason.into()));
    }

    /// Forget a resource entirely.
    pub fn remove(&self, resource: &ResourceId) {
        self.resources.write().remove(resource);
    }
}

impl SnapshotReader for MemoryReader {
    fn name(&self) -> &str {
        "memory"
    }

    fn read(&self, resource: &ResourceId) -> Result<Snapshot, ReadError> {
        match self.resources.read().get(resource) {
            Some(Content::Rows(records)) => Ok(Snapshot::new(records.clone())),
            Some(Content::Broken(reason)) => Err(ReadError::unavailable(resource, reason)),
            None => Err(ReadError::unavailable(resource, "no such resource")),
        }
    }
}
