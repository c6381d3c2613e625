//! Change subscriber that archives every event.

use std::sync::Arc;

use super::VersionedArchive;
use crate::notifier::{ChangeHandler, HandlerError};
use crate::types::ChangeEvent;

/// Records each published change in a [`VersionedArchive`].
pub struct ArchiveSubscriber {
    archive: Arc<VersionedArchive>,
}

impl ArchiveSubscriber {
    pub fn new(archive: Arc<VersionedArchive>) -> Self {
        Self { archive }
    }
}

impl ChangeHandler for ArchiveSubscriber {
    fn name(&self) -> &str {
        "archive"
    }

    fn on_change(&self, event: &ChangeEvent) -> Result<(), HandlerError> {
        self.archive
            .record(event)
            .map(|_| ())
            .map_err(|e| HandlerError::failed(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::ChangeNotifier;
    use crate::types::{Record, ResourceId};
    use chrono::Utc;

    #[test]
    fn test_published_events_are_archived() {
        let archive = Arc::new(VersionedArchive::in_memory());
        let notifier = ChangeNotifier::new();
        notifier.subscribe(ArchiveSubscriber::new(archive.clone()));

        let event = ChangeEvent::new(
            ResourceId::from("a.csv"),
            Utc::now(),
            vec![],
            vec![Record::from_pairs([("id", "1")])],
        );
        notifier.publish(&event);
        notifier.publish(&event);

        let versions = archive.query(&ResourceId::from("a.csv")).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].removed, event.removed);
    }
}
