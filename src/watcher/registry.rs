//! Registry of active watches, one per resource.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::clock::{Clock, SystemClock};
use super::error::WatchError;
use super::watch_loop::{LoopState, WatchLoop, WatchStats};
use crate::notifier::ChangeNotifier;
use crate::snapshot::SnapshotReader;
use crate::types::{Owner, ResourceId};

/// Identifies one registered watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchDescriptor {
    pub resource_id: ResourceId,
    pub interval: Duration,
    pub description: String,
    pub owner: Owner,
}

struct WatchEntry {
    descriptor: WatchDescriptor,
    watch: Arc<WatchLoop>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Tracks watch loops keyed by resource.
///
/// At most one watch exists per resource. Registering does not start the
/// loop; call [`WatcherRegistry::start`] once the watch is configured.
/// Unregistering stops the loop.
pub struct WatcherRegistry {
    entries: DashMap<ResourceId, WatchEntry>,
    reader: Arc<dyn SnapshotReader>,
    notifier: Arc<ChangeNotifier>,
    clock: Arc<dyn Clock>,
}

impl WatcherRegistry {
    pub fn new(reader: Arc<dyn SnapshotReader>, notifier: Arc<ChangeNotifier>) -> Self {
        Self::with_clock(reader, notifier, Arc::new(SystemClock))
    }

    pub fn with_clock(
        reader: Arc<dyn SnapshotReader>,
        notifier: Arc<ChangeNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            reader,
            notifier,
            clock,
        }
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Register a watch for `resource`, owned by `owner`.
    ///
    /// Fails with [`WatchError::AlreadyWatched`] naming the current owner
    /// if the resource is already registered.
    pub fn register(
        &self,
        resource: impl Into<ResourceId>,
        interval: Duration,
        description: impl Into<String>,
        owner: &Owner,
    ) -> Result<WatchDescriptor, WatchError> {
        let resource = resource.into();
        if interval.is_zero() {
            return Err(WatchError::InvalidInterval { resource });
        }

        match self.entries.entry(resource.clone()) {
            Entry::Occupied(existing) => Err(WatchError::AlreadyWatched {
                resource,
                owner: existing.get().descriptor.owner.clone(),
            }),
            Entry::Vacant(slot) => {
                let descriptor = WatchDescriptor {
                    resource_id: resource.clone(),
                    interval,
                    description: description.into(),
                    owner: owner.clone(),
                };
                let watch = Arc::new(WatchLoop::new(
                    resource.clone(),
                    interval,
                    Arc::clone(&self.reader),
                    Arc::clone(&self.notifier),
                    Arc::clone(&self.clock),
                ));
                slot.insert(WatchEntry {
                    descriptor: descriptor.clone(),
                    watch,
                    task: Mutex::new(None),
                });

                crate::log_event!("registry", "registered", "{resource} for {owner}");
                Ok(descriptor)
            }
        }
    }

    /// Remove the watch for `resource` and stop its loop.
    ///
    /// Only the owner may unregister; anyone else gets
    /// [`WatchError::NotOwner`] and nothing changes.
    pub fn unregister(
        &self,
        resource: &ResourceId,
        owner: &Owner,
    ) -> Result<WatchDescriptor, WatchError> {
        if let Some((_, entry)) = self
            .entries
            .remove_if(resource, |_, entry| entry.descriptor.owner == *owner)
        {
            entry.watch.stop();
            crate::log_event!("registry", "unregistered", "{resource} by {owner}");
            return Ok(entry.descriptor);
        }

        match self.entries.get(resource) {
            Some(entry) => {
                let err = WatchError::NotOwner {
                    resource: resource.clone(),
                    owner: entry.descriptor.owner.clone(),
                    caller: owner.clone(),
                };
                tracing::warn!("[registry] {err}");
                Err(err)
            }
            None => Err(WatchError::NotFound {
                resource: resource.clone(),
            }),
        }
    }

    pub fn get(&self, resource: &ResourceId) -> Option<WatchDescriptor> {
        self.entries
            .get(resource)
            .map(|entry| entry.descriptor.clone())
    }

    /// All descriptors, optionally only those of `owner`, sorted by resource.
    pub fn list(&self, owner: Option<&Owner>) -> Vec<WatchDescriptor> {
        let mut descriptors: Vec<WatchDescriptor> = self
            .entries
            .iter()
            .filter(|entry| owner.is_none_or(|o| entry.descriptor.owner == *o))
            .map(|entry| entry.descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        descriptors
    }

    /// The loop behind a registered watch.
    pub fn watch(&self, resource: &ResourceId) -> Option<Arc<WatchLoop>> {
        self.entries
            .get(resource)
            .map(|entry| Arc::clone(&entry.watch))
    }

    pub fn state(&self, resource: &ResourceId) -> Option<LoopState> {
        self.entries.get(resource).map(|entry| entry.watch.state())
    }

    pub fn stats(&self, resource: &ResourceId) -> Option<WatchStats> {
        self.entries.get(resource).map(|entry| entry.watch.stats())
    }

    /// Start the loop for a registered watch on the tokio runtime.
    pub fn start(&self, resource: &ResourceId) -> Result<(), WatchError> {
        let entry = self
            .entries
            .get(resource)
            .ok_or_else(|| WatchError::NotFound {
                resource: resource.clone(),
            })?;

        let handle = entry.watch.start()?;
        *entry.task.lock() = Some(handle);
        Ok(())
    }

    /// Ask the loop for `resource` to stop. The watch stays registered.
    pub fn stop(&self, resource: &ResourceId) -> Result<(), WatchError> {
        let entry = self
            .entries
            .get(resource)
            .ok_or_else(|| WatchError::NotFound {
                resource: resource.clone(),
            })?;
        entry.watch.stop();
        Ok(())
    }

    /// Stop every loop and wait for the running ones to finish.
    pub async fn shutdown(&self) {
        let mut handles = Vec::new();
        for entry in self.entries.iter() {
            entry.watch.stop();
            if let Some(handle) = entry.task.lock().take() {
                handles.push((entry.descriptor.resource_id.clone(), handle));
            }
        }

        for (resource, handle) in handles {
            if let Err(e) = handle.await {
                tracing::error!("[registry] watch task for {resource} failed: {e}");
            }
        }

        crate::log_event!("registry", "shutdown", "{} watches", self.entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
