//! Polling watchers for tabular resources.
//!
//! # Architecture
//!
//! ```text
//! WatcherRegistry (resource -> WatchDescriptor + WatchLoop)
//!         |
//!    +----------+----------+
//!    |          |          |
//! WatchLoop  WatchLoop  WatchLoop      one tokio task each
//!    |  read + diff every interval
//!    v
//! ChangeNotifier -> subscribers (archive, log, ...)
//! ```

mod clock;
mod error;
mod registry;
mod scope;
mod watch_loop;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::WatchError;
pub use registry::{WatchDescriptor, WatcherRegistry};
pub use scope::OwnerScope;
pub use watch_loop::{LoopState, WatchLoop, WatchStats};
