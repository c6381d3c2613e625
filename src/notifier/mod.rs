//! Fan-out dispatch of change events to in-process subscribers.
//!
//! Subscribers are held in subscription order and addressed by an explicit
//! [`SubscriptionId`]. `publish` calls every handler synchronously with the
//! same event. A failing or panicking handler is logged and skipped; the
//! remaining handlers still receive the event.

mod handler;
mod subscribers;

pub use handler::{ChangeHandler, FnHandler, HandlerError};
pub use subscribers::LogSubscriber;

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::types::ChangeEvent;

/// Handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of one `publish` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handlers that returned successfully.
    pub delivered: usize,
    /// Errors from handlers that failed, in subscription order.
    pub failures: Vec<HandlerError>,
}

struct Subscription {
    id: SubscriptionId,
    handler: Arc<dyn ChangeHandler>,
}

/// Typed subscription list for change events.
pub struct ChangeNotifier {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a subscriber at the end of the delivery order.
    pub fn subscribe(&self, handler: impl ChangeHandler + 'static) -> SubscriptionId {
        self.subscribe_shared(Arc::new(handler))
    }

    /// Add a shared subscriber at the end of the delivery order.
    pub fn subscribe_shared(&self, handler: Arc<dyn ChangeHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        crate::debug_event!("notifier", "subscribed", "{} as {id}", handler.name());
        self.subscriptions.write().push(Subscription { id, handler });
        id
    }

    /// Remove a subscription. Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        let removed = subscriptions.len() != before;
        if removed {
            crate::debug_event!("notifier", "unsubscribed", "{id}");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    ///
    /// The subscriber list is copied before delivery, so handlers may
    /// subscribe or unsubscribe without deadlocking.
    pub fn publish(&self, event: &ChangeEvent) -> PublishReport {
        let handlers: Vec<Arc<dyn ChangeHandler>> = self
            .subscriptions
            .read()
            .iter()
            .map(|s| s.handler.clone())
            .collect();

        let mut report = PublishReport::default();

        if handlers.is_empty() {
            crate::debug_event!(
                "notifier",
                "dropped",
                "no subscribers for change in {}",
                event.resource_id
            );
            return report;
        }

        for handler in handlers {
            let result = catch_unwind(AssertUnwindSafe(|| handler.on_change(event)))
                .unwrap_or_else(|_| {
                    Err(HandlerError::Panicked {
                        handler: handler.name().to_string(),
                    })
                });

            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::error!("[notifier] {e}");
                    report.failures.push(e);
                }
            }
        }

        crate::debug_event!(
            "notifier",
            "published",
            "{} to {} subscribers ({} failed)",
            event.resource_id,
            report.delivered + report.failures.len(),
            report.failures.len()
        );

        report
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
