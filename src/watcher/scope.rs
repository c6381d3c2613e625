//! Owner-bound view of the registry.

use std::sync::Arc;
use std::time::Duration;

use super::error::WatchError;
use super::registry::{WatchDescriptor, WatcherRegistry};
use crate::types::{Owner, ResourceId};

/// Registry handle that acts on behalf of one owner.
///
/// Components hold one of these instead of passing their owner name on
/// every call. Lookups only see the owner's own watches.
#[derive(Clone)]
pub struct OwnerScope {
    registry: Arc<WatcherRegistry>,
    owner: Owner,
}

impl OwnerScope {
    pub fn new(registry: Arc<WatcherRegistry>, owner: Owner) -> Self {
        Self { registry, owner }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn register(
        &self,
        resource: impl Into<ResourceId>,
        interval: Duration,
        description: impl Into<String>,
    ) -> Result<WatchDescriptor, WatchError> {
        self.registry
            .register(resource, interval, description, &self.owner)
    }

    /// Register and immediately start a watch.
    pub fn watch(
        &self,
        resource: impl Into<ResourceId>,
        interval: Duration,
        description: impl Into<String>,
    ) -> Result<WatchDescriptor, WatchError> {
        let descriptor = self.register(resource, interval, description)?;
        if let Err(e) = self.registry.start(&descriptor.resource_id) {
            // Leave nothing half-registered behind
            let _ = self.registry.unregister(&descriptor.resource_id, &self.owner);
            return Err(e);
        }
        Ok(descriptor)
    }

    pub fn unregister(&self, resource: &ResourceId) -> Result<WatchDescriptor, WatchError> {
        self.registry.unregister(resource, &self.owner)
    }

    /// The owner's watch for `resource`, if it has one.
    pub fn get(&self, resource: &ResourceId) -> Option<WatchDescriptor> {
        self.registry
            .get(resource)
            .filter(|descriptor| descriptor.owner == self.owner)
    }

    pub fn list(&self) -> Vec<WatchDescriptor> {
        self.registry.list(Some(&self.owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::ChangeNotifier;
    use crate::snapshot::MemoryReader;
    use crate::watcher::LoopState;

    fn registry() -> Arc<WatcherRegistry> {
        Arc::new(WatcherRegistry::new(
            Arc::new(MemoryReader::new()),
            Arc::new(ChangeNotifier::new()),
        ))
    }

    #[test]
    fn test_scopes_see_only_their_watches() {
        let registry = registry();
        let importer = OwnerScope::new(registry.clone(), Owner::from("importer"));
        let reporter = OwnerScope::new(registry.clone(), Owner::from("reporter"));

        importer
            .register("a.csv", Duration::from_secs(1), "a")
            .unwrap();
        reporter
            .register("b.csv", Duration::from_secs(1), "b")
            .unwrap();

        assert_eq!(importer.list().len(), 1);
        assert!(importer.get(&ResourceId::from("b.csv")).is_none());
        assert!(reporter.get(&ResourceId::from("b.csv")).is_some());
        assert_eq!(registry.list(None).len(), 2);
    }

    #[test]
    fn test_scope_cannot_unregister_foreign_watch() {
        let registry = registry();
        let importer = OwnerScope::new(registry.clone(), Owner::from("importer"));
        let reporter = OwnerScope::new(registry.clone(), Owner::from("reporter"));

        importer
            .register("a.csv", Duration::from_secs(1), "a")
            .unwrap();

        let err = reporter.unregister(&ResourceId::from("a.csv")).unwrap_err();
        assert!(matches!(err, WatchError::NotOwner { .. }));
        assert!(importer.unregister(&ResourceId::from("a.csv")).is_ok());
    }

    #[tokio::test]
    async fn test_watch_registers_and_starts() {
        let registry = registry();
        let scope = OwnerScope::new(registry.clone(), Owner::from("importer"));

        let descriptor = scope
            .watch("a.csv", Duration::from_secs(60), "a")
            .unwrap();
        assert_eq!(
            registry.state(&descriptor.resource_id),
            Some(LoopState::Running)
        );

        registry.shutdown().await;
    }
}
