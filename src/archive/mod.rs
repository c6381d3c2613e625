//! Versioned archive of change events.
//!
//! Each [`ChangeEvent`] becomes an immutable [`VersionRecord`]. Versions
//! of a resource count up from 1 without gaps; 0 means "never changed".
//! Deleting a resource's records leaves its counter alone, so later
//! changes continue the sequence.

mod error;
mod json_store;
mod memory;
mod store;
mod subscriber;

pub use error::{ArchiveError, ArchiveResult};
pub use json_store::JsonFileStore;
pub use memory::MemoryStore;
pub use store::{ArchiveStore, ResourceHistory, ResourceSummary, VersionRecord};
pub use subscriber::ArchiveSubscriber;

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::types::{ChangeEvent, ResourceId};
use crate::watcher::{Clock, SystemClock};

/// Records change events as numbered versions per resource.
///
/// `record` calls for one resource are serialized by a per-resource lock,
/// so the read-increment-append sequence cannot interleave. Calls for
/// different resources proceed independently.
pub struct VersionedArchive {
    store: Arc<dyn ArchiveStore>,
    locks: DashMap<ResourceId, Arc<Mutex<()>>>,
    clock: Arc<dyn Clock>,
}

impl VersionedArchive {
    pub fn new(store: Arc<dyn ArchiveStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn ArchiveStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            clock,
        }
    }

    /// Archive backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn lock_for(&self, resource: &ResourceId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(resource.clone()).or_default().value())
    }

    /// Archive `event` as the resource's next version.
    ///
    /// The counter only advances if the store accepted the record.
    pub fn record(&self, event: &ChangeEvent) -> ArchiveResult<VersionRecord> {
        let resource = &event.resource_id;
        let lock = self.lock_for(resource);
        let _guard = lock.lock();

        let current = self.store.current_version(resource)?;
        let record = VersionRecord {
            resource_id: resource.clone(),
            version: current + 1,
            created_at: self.clock.now(),
            added: event.added.clone(),
            removed: event.removed.clone(),
        };

        if let Err(e) = self.store.append(&record) {
            tracing::error!("[archive] {e}");
            return Err(e);
        }

        crate::log_event!(
            "archive",
            "recorded",
            "{resource} v{} (+{} -{})",
            record.version,
            record.added.len(),
            record.removed.len()
        );
        Ok(record)
    }

    /// Archived records for `resource`, by ascending version.
    pub fn query(&self, resource: &ResourceId) -> ArchiveResult<Vec<VersionRecord>> {
        self.store.query(resource)
    }

    /// Counter of the last archived change, 0 if none.
    pub fn current_version(&self, resource: &ResourceId) -> ArchiveResult<u64> {
        self.store.current_version(resource)
    }

    /// Remove all records for `resource`. The counter is kept.
    pub fn delete_versions(&self, resource: &ResourceId) -> ArchiveResult<usize> {
        let lock = self.lock_for(resource);
        let _guard = lock.lock();

        let removed = self.store.delete_versions(resource)?;
        crate::log_event!("archive", "deleted", "{removed} versions of {resource}");
        Ok(removed)
    }

    /// All resources with archived history.
    pub fn resources(&self) -> ArchiveResult<Vec<ResourceSummary>> {
        self.store.resources()
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;
    use crate::watcher::ManualClock;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn event(resource: &str, id: &str) -> ChangeEvent {
        ChangeEvent::new(
            ResourceId::from(resource),
            Utc::now(),
            vec![Record::from_pairs([("id", id)])],
            vec![],
        )
    }

    /// Memory store whose writes can be switched off.
    struct FlakyStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl ArchiveStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }
        fn current_version(&self, resource: &ResourceId) -> ArchiveResult<u64> {
            self.inner.current_version(resource)
        }
        fn append(&self, record: &VersionRecord) -> ArchiveResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ArchiveError::write_failed(&record.resource_id, "disk full"));
            }
            self.inner.append(record)
        }
        fn query(&self, resource: &ResourceId) -> ArchiveResult<Vec<VersionRecord>> {
            self.inner.query(resource)
        }
        fn delete_versions(&self, resource: &ResourceId) -> ArchiveResult<usize> {
            self.inner.delete_versions(resource)
        }
        fn resources(&self) -> ArchiveResult<Vec<ResourceSummary>> {
            self.inner.resources()
        }
    }

    #[test]
    fn test_first_record_is_version_one() {
        let archive = VersionedArchive::in_memory();
        let id = ResourceId::from("a.csv");
        assert_eq!(archive.current_version(&id).unwrap(), 0);

        let record = archive.record(&event("a.csv", "1")).unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.added, vec![Record::from_pairs([("id", "1")])]);
    }

    #[test]
    fn test_sequential_records_are_gapless() {
        let archive = VersionedArchive::in_memory();
        for i in 0..10 {
            archive.record(&event("a.csv", &i.to_string())).unwrap();
        }

        let versions: Vec<u64> = archive
            .query(&ResourceId::from("a.csv"))
            .unwrap()
            .iter()
            .map(|r| r.version)
            .collect();
        assert_eq!(versions, (1..=10).collect::<Vec<u64>>());
    }

    #[test]
    fn test_resources_are_numbered_independently() {
        let archive = VersionedArchive::in_memory();
        archive.record(&event("a.csv", "1")).unwrap();
        archive.record(&event("a.csv", "2")).unwrap();
        let b = archive.record(&event("b.csv", "1")).unwrap();

        assert_eq!(b.version, 1);
        assert_eq!(archive.resources().unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_records_are_gapless() {
        let archive = Arc::new(VersionedArchive::in_memory());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let archive = Arc::clone(&archive);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|i| {
                            archive
                                .record(&event("shared.csv", &format!("{t}-{i}")))
                                .unwrap()
                                .version
                        })
                        .collect::<Vec<u64>>()
                })
            })
            .collect();

        let mut versions: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        versions.sort_unstable();

        assert_eq!(versions, (1..=200).collect::<Vec<u64>>());
        let stored: Vec<u64> = archive
            .query(&ResourceId::from("shared.csv"))
            .unwrap()
            .iter()
            .map(|r| r.version)
            .collect();
        assert_eq!(stored, (1..=200).collect::<Vec<u64>>());
    }

    #[test]
    fn test_failed_write_does_not_advance_counter() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        });
        let archive = VersionedArchive::new(store.clone());
        let id = ResourceId::from("a.csv");

        archive.record(&event("a.csv", "1")).unwrap();

        store.failing.store(true, Ordering::SeqCst);
        let err = archive.record(&event("a.csv", "2")).unwrap_err();
        assert!(matches!(err, ArchiveError::WriteFailed { .. }));
        assert_eq!(archive.current_version(&id).unwrap(), 1);

        store.failing.store(false, Ordering::SeqCst);
        assert_eq!(archive.record(&event("a.csv", "2")).unwrap().version, 2);
    }

    #[test]
    fn test_delete_leaves_gap_not_renumbering() {
        let archive = VersionedArchive::in_memory();
        let id = ResourceId::from("a.csv");
        archive.record(&event("a.csv", "1")).unwrap();
        archive.record(&event("a.csv", "2")).unwrap();

        assert_eq!(archive.delete_versions(&id).unwrap(), 2);
        assert!(archive.query(&id).unwrap().is_empty());

        let next = archive.record(&event("a.csv", "3")).unwrap();
        assert_eq!(next.version, 3);
        let versions: Vec<u64> = archive.query(&id).unwrap().iter().map(|r| r.version).collect();
        assert_eq!(versions, vec![3]);
    }

    #[test]
    fn test_created_at_comes_from_clock() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let archive = VersionedArchive::with_clock(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(at)),
        );

        let record = archive.record(&event("a.csv", "1")).unwrap();
        assert_eq!(record.created_at, at);
    }
}
