//! Polling loop for one resource.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::clock::Clock;
use super::error::WatchError;
use crate::diff::diff;
use crate::notifier::ChangeNotifier;
use crate::snapshot::SnapshotReader;
use crate::types::{ChangeEvent, ResourceId, Snapshot};

/// Lifecycle of a watch loop: `Idle -> Running -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, not yet started.
    Idle,
    /// Polling on its interval.
    Running,
    /// Finished. Terminal.
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopState::Idle => "idle",
            LoopState::Running => "running",
            LoopState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Counters for one watch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Poll cycles that read the resource successfully.
    pub cycles: u64,
    /// Cycles that produced a change event.
    pub changes: u64,
    /// Cycles where the resource could not be read.
    pub read_failures: u64,
}

/// Polls one resource, diffs each snapshot against the last good one and
/// publishes a [`ChangeEvent`] for every non-empty difference.
///
/// The baseline starts empty, so the first successful poll reports the
/// whole content as added. A failed read leaves the baseline untouched.
/// Stopping is cooperative: the cancellation token is checked before each
/// cycle and ends the wait between cycles.
pub struct WatchLoop {
    resource: ResourceId,
    interval: Duration,
    reader: Arc<dyn SnapshotReader>,
    notifier: Arc<ChangeNotifier>,
    clock: Arc<dyn Clock>,
    /// Held from read through publish so events leave in poll order.
    /// Reentrant: a handler may poll the loop that is publishing to it.
    ordering: ReentrantMutex<()>,
    /// Last successfully read snapshot.
    baseline: Mutex<Snapshot>,
    state: Mutex<LoopState>,
    stats: Mutex<WatchStats>,
    cancel: CancellationToken,
}

impl WatchLoop {
    pub fn new(
        resource: ResourceId,
        interval: Duration,
        reader: Arc<dyn SnapshotReader>,
        notifier: Arc<ChangeNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resource,
            interval,
            reader,
            notifier,
            clock,
            ordering: ReentrantMutex::new(()),
            baseline: Mutex::new(Snapshot::empty()),
            state: Mutex::new(LoopState::Idle),
            stats: Mutex::new(WatchStats::default()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> LoopState {
        *self.state.lock()
    }

    pub fn stats(&self) -> WatchStats {
        *self.stats.lock()
    }

    /// Run one poll cycle without waiting: read, diff, replace the
    /// baseline, publish.
    ///
    /// Returns the published event, if any. `run` drives this on the
    /// interval; calling it directly is meant for loops that are not
    /// running. Handlers may call it on the loop that is publishing to
    /// them; the nested cycle completes before the outer publish resumes.
    pub fn poll_once(&self) -> Option<ChangeEvent> {
        let _ordering = self.ordering.lock();

        let event = self.advance()?;
        self.notifier.publish(&event);
        Some(event)
    }

    /// Read and diff against the baseline, then replace it. The baseline
    /// lock is released before anything is published.
    fn advance(&self) -> Option<ChangeEvent> {
        let mut baseline = self.baseline.lock();

        let snapshot = match self.reader.read(&self.resource) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.stats.lock().read_failures += 1;
                tracing::warn!("[watch-loop] {e}, retrying in {:?}", self.interval);
                return None;
            }
        };

        let changes = diff(&baseline, &snapshot);
        *baseline = snapshot;

        let mut stats = self.stats.lock();
        stats.cycles += 1;

        if changes.is_empty() {
            crate::debug_event!("watch-loop", "unchanged", "{}", self.resource);
            return None;
        }
        stats.changes += 1;
        drop(stats);

        crate::debug_event!(
            "watch-loop",
            "change detected",
            "{} +{} -{}",
            self.resource,
            changes.added.len(),
            changes.removed.len()
        );

        Some(ChangeEvent::new(
            self.resource.clone(),
            self.clock.now(),
            changes.added,
            changes.removed,
        ))
    }

    /// Move `Idle -> Running`, or fail if the loop was already started.
    fn begin(&self) -> Result<(), WatchError> {
        let mut state = self.state.lock();
        if *state != LoopState::Idle {
            return Err(WatchError::NotStartable {
                resource: self.resource.clone(),
                state: *state,
            });
        }
        *state = LoopState::Running;
        Ok(())
    }

    /// Run the loop on the current task until stopped.
    pub async fn run(self: Arc<Self>) -> Result<(), WatchError> {
        self.begin()?;
        self.cycle().await;
        Ok(())
    }

    /// Spawn the loop as a task on the current tokio runtime.
    ///
    /// Fails with [`WatchError::NoRuntime`] outside a runtime, leaving the
    /// loop `Idle`.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, WatchError> {
        let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime {
            resource: self.resource.clone(),
        })?;
        self.begin()?;
        let this = Arc::clone(self);
        Ok(runtime.spawn(async move { this.cycle().await }))
    }

    async fn cycle(self: Arc<Self>) {
        crate::log_event!(
            "watch-loop",
            "started",
            "{} every {:?}",
            self.resource,
            self.interval
        );

        while !self.cancel.is_cancelled() {
            // Reading and handlers are blocking work
            let this = Arc::clone(&self);
            if let Err(e) = tokio::task::spawn_blocking(move || this.poll_once()).await {
                tracing::error!("[watch-loop] poll of {} aborted: {e}", self.resource);
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        *self.state.lock() = LoopState::Stopped;
        crate::log_event!("watch-loop", "stopped", "{}", self.resource);
    }

    /// Request the loop to stop.
    ///
    /// A running loop finishes its current cycle and moves to `Stopped`
    /// without waiting out the interval. An idle loop is stopped at once
    /// and can no longer be started.
    pub fn stop(&self) {
        self.cancel.cancel();
        let mut state = self.state.lock();
        if *state == LoopState::Idle {
            *state = LoopState::Stopped;
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for WatchLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchLoop")
            .field("resource", &self.resource)
            .field("interval", &self.interval)
            .field("reader", &self.reader.name())
            .field("state", &self.state())
            .finish()
    }
}
