//! Error types for watch registration and lifecycle.

use thiserror::Error;

use super::LoopState;
use crate::types::{Owner, ResourceId};

/// Errors from registry and watch loop operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("Resource {resource} is already watched by {owner}")]
    AlreadyWatched { resource: ResourceId, owner: Owner },

    #[error("Resource {resource} is watched by {owner}, not by {caller}")]
    NotOwner {
        resource: ResourceId,
        owner: Owner,
        caller: Owner,
    },

    #[error("Resource {resource} is not watched")]
    NotFound { resource: ResourceId },

    #[error("Poll interval for {resource} must be greater than zero")]
    InvalidInterval { resource: ResourceId },

    #[error("Watch for {resource} needs a running tokio runtime to start")]
    NoRuntime { resource: ResourceId },

    #[error("Watch for {resource} cannot start from state {state}")]
    NotStartable {
        resource: ResourceId,
        state: LoopState,
    },
}
