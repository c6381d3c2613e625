//! Wiring of reader, notifier, registry and archive.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::archive::{
    ArchiveResult, ArchiveStore, ArchiveSubscriber, JsonFileStore, MemoryStore, VersionedArchive,
};
use crate::config::{ArchiveBackend, ArchiveConfig, Settings};
use crate::notifier::{ChangeNotifier, SubscriptionId};
use crate::snapshot::{CsvSnapshotReader, SnapshotReader};
use crate::types::{Owner, ResourceId};
use crate::watcher::{OwnerScope, WatchDescriptor, WatchError, WatcherRegistry};

/// Open the archive backend named in the configuration.
pub fn open_archive(config: &ArchiveConfig) -> ArchiveResult<VersionedArchive> {
    let store: Arc<dyn ArchiveStore> = match config.backend {
        ArchiveBackend::Memory => Arc::new(MemoryStore::new()),
        ArchiveBackend::Json => Arc::new(JsonFileStore::open(&config.path)?),
    };
    Ok(VersionedArchive::new(store))
}

/// Owns the watch machinery for one application.
///
/// Every piece is constructed explicitly and handed in, so several hosts
/// (for instance in tests) can coexist in one process.
pub struct WatchHost {
    notifier: Arc<ChangeNotifier>,
    registry: Arc<WatcherRegistry>,
    archive: Arc<VersionedArchive>,
    archive_subscription: Option<SubscriptionId>,
}

impl WatchHost {
    pub fn new(reader: Arc<dyn SnapshotReader>, archive: Arc<VersionedArchive>) -> Self {
        let notifier = Arc::new(ChangeNotifier::new());
        let registry = Arc::new(WatcherRegistry::new(reader, Arc::clone(&notifier)));
        Self {
            notifier,
            registry,
            archive,
            archive_subscription: None,
        }
    }

    /// Build a host from settings: CSV reader, configured archive backend,
    /// archiving enabled.
    pub fn from_settings(settings: &Settings) -> ArchiveResult<Self> {
        let reader = Arc::new(CsvSnapshotReader::new(&settings.csv));
        let archive = open_archive(&settings.archive)?;

        let mut host = Self::new(reader, Arc::new(archive));
        host.enable_archiving();
        Ok(host)
    }

    /// Subscribe the archive to change events. Idempotent.
    pub fn enable_archiving(&mut self) -> SubscriptionId {
        if let Some(id) = self.archive_subscription {
            return id;
        }
        let id = self
            .notifier
            .subscribe(ArchiveSubscriber::new(Arc::clone(&self.archive)));
        self.archive_subscription = Some(id);
        id
    }

    /// Stop archiving change events.
    pub fn disable_archiving(&mut self) {
        if let Some(id) = self.archive_subscription.take() {
            self.notifier.unsubscribe(id);
        }
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    pub fn registry(&self) -> &Arc<WatcherRegistry> {
        &self.registry
    }

    pub fn archive(&self) -> &Arc<VersionedArchive> {
        &self.archive
    }

    /// Registry handle acting as `owner`.
    pub fn scope(&self, owner: impl Into<String>) -> OwnerScope {
        OwnerScope::new(Arc::clone(&self.registry), Owner::new(owner))
    }

    /// Register and start every watch listed in the settings.
    ///
    /// A watch that cannot be registered is logged and skipped. Returns
    /// the watches that were started.
    pub fn load_configured_watches(&self, settings: &Settings) -> Vec<WatchDescriptor> {
        let scope = self.scope(settings.watch.owner.clone());
        let mut started = Vec::new();

        for resource in &settings.watch.resources {
            let description = resource
                .description
                .clone()
                .unwrap_or_else(|| format!("Watcher for {}", resource.path.display()));
            let interval = settings.watch.interval_for(resource);

            match scope.watch(ResourceId::from(resource.path.as_path()), interval, description) {
                Ok(descriptor) => started.push(descriptor),
                Err(e) => tracing::error!("[host] couldn't activate watch: {e}"),
            }
        }

        started
    }

    /// Register and start a watch in one step.
    pub fn watch(
        &self,
        owner: &Owner,
        resource: impl Into<ResourceId>,
        interval: Duration,
        description: impl Into<String>,
    ) -> Result<WatchDescriptor, WatchError> {
        OwnerScope::new(Arc::clone(&self.registry), owner.clone()).watch(
            resource,
            interval,
            description,
        )
    }

    /// Stop every watch and wait for the loops to finish.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}

impl fmt::Debug for WatchHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHost")
            .field("archive", &self.archive.store_name())
            .field("archiving", &self.archive_subscription.is_some())
            .field("watches", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchedResource;
    use tempfile::TempDir;

    #[test]
    fn test_archiving_toggle() {
        let mut host = WatchHost::new(
            Arc::new(CsvSnapshotReader::default()),
            Arc::new(VersionedArchive::in_memory()),
        );
        assert_eq!(host.notifier().subscriber_count(), 0);

        let first = host.enable_archiving();
        assert_eq!(host.enable_archiving(), first);
        assert_eq!(host.notifier().subscriber_count(), 1);

        host.disable_archiving();
        assert_eq!(host.notifier().subscriber_count(), 0);
    }

    #[test]
    fn test_debug_shows_store_and_watch_count() {
        let host = WatchHost::new(
            Arc::new(CsvSnapshotReader::default()),
            Arc::new(VersionedArchive::in_memory()),
        );
        host.registry()
            .register("a.csv", Duration::from_secs(1), "a", &Owner::from("app"))
            .unwrap();

        let debug = format!("{host:?}");
        assert!(debug.contains("archive: \"memory\""));
        assert!(debug.contains("watches: 1"));
    }

    #[tokio::test]
    async fn test_from_settings_loads_configured_watches() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("a.csv");
        std::fs::write(&csv, "id,val\n1,a\n").unwrap();

        let mut settings = Settings::default();
        settings.archive.path = dir.path().join("archive");
        settings.watch.resources = vec![
            WatchedResource {
                path: csv.clone(),
                interval_secs: Some(60),
                description: None,
            },
            WatchedResource {
                path: csv.clone(),
                interval_secs: None,
                description: Some("duplicate".to_string()),
            },
        ];

        let host = WatchHost::from_settings(&settings).unwrap();
        let started = host.load_configured_watches(&settings);

        assert_eq!(started.len(), 1);
        assert_eq!(started[0].owner, Owner::from("tabwatch"));
        assert_eq!(
            started[0].description,
            format!("Watcher for {}", csv.display())
        );
        assert!(settings.archive.path.is_dir());
        assert_eq!(host.archive().store_name(), "json");

        host.shutdown().await;
    }
}
