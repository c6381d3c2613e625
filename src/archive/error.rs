//! Error types for the change archive.

use thiserror::Error;

use crate::types::ResourceId;

/// Errors from archive and store operations.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to write history for {resource}: {reason}")]
    WriteFailed { resource: ResourceId, reason: String },

    #[error("Failed to read archive: {reason}")]
    ReadFailed { reason: String },

    #[error("Archive IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    pub fn write_failed(resource: &ResourceId, reason: impl ToString) -> Self {
        ArchiveError::WriteFailed {
            resource: resource.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
