pub mod archive;
pub mod cli;
pub mod config;
pub mod diff;
pub mod host;
pub mod logging;
pub mod notifier;
pub mod snapshot;
pub mod types;
pub mod watcher;

pub use archive::{ArchiveError, ArchiveSubscriber, VersionRecord, VersionedArchive};
pub use config::Settings;
pub use diff::{Diff, diff};
pub use host::WatchHost;
pub use notifier::{ChangeHandler, ChangeNotifier, HandlerError, SubscriptionId};
pub use snapshot::{CsvSnapshotReader, MemoryReader, ReadError, SnapshotReader};
pub use types::{ChangeEvent, Owner, Record, ResourceId, Snapshot};
pub use watcher::{LoopState, OwnerScope, WatchDescriptor, WatchError, WatchLoop, WatcherRegistry};
