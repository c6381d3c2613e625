//! Snapshot readers: load the current content of a resource as records.
//!
//! A reader re-reads the whole resource on every call. Nothing is carried
//! between calls, so a header change between two polls simply produces
//! records with the new column set.

mod csv_reader;
mod memory;

pub use csv_reader::CsvSnapshotReader;
pub use memory::MemoryReader;

use thiserror::Error;

use crate::types::{ResourceId, Snapshot};

/// Errors from reading a resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("Resource {resource} unavailable: {reason}")]
    ResourceUnavailable { resource: ResourceId, reason: String },
}

impl ReadError {
    pub fn unavailable(resource: &ResourceId, reason: impl ToString) -> Self {
        ReadError::ResourceUnavailable {
            resource: resource.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Capability to load a resource's current content.
pub trait SnapshotReader: Send + Sync {
    /// Reader name for logging.
    fn name(&self) -> &str;

    /// Fully re-read the resource.
    fn read(&self, resource: &ResourceId) -> Result<Snapshot, ReadError>;
}
