//! Built-in subscribers.

use super::{ChangeHandler, HandlerError};
use crate::types::ChangeEvent;

/// Logs a one-line summary of every change, with rows at debug level.
#[derive(Debug, Default)]
pub struct LogSubscriber;

impl LogSubscriber {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeHandler for LogSubscriber {
    fn name(&self) -> &str {
        "log"
    }

    fn on_change(&self, event: &ChangeEvent) -> Result<(), HandlerError> {
        crate::log_event!(
            "change",
            event.resource_id.as_str(),
            "+{} -{}",
            event.added.len(),
            event.removed.len()
        );
        for row in &event.added {
            crate::debug_event!("change", "added", "{row:?}");
        }
        for row in &event.removed {
            crate::debug_event!("change", "removed", "{row:?}");
        }
        Ok(())
    }
}
