//! Handler trait for change event subscribers.

use thiserror::Error;

use crate::types::ChangeEvent;

/// Errors raised by a subscriber while handling an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Handler '{handler}' failed: {reason}")]
    Failed { handler: String, reason: String },

    #[error("Handler '{handler}' panicked")]
    Panicked { handler: String },
}

impl HandlerError {
    pub fn failed(handler: &str, reason: impl ToString) -> Self {
        HandlerError::Failed {
            handler: handler.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Subscriber that reacts to change events.
///
/// Handlers run synchronously on the publishing task, so they should
/// return quickly.
pub trait ChangeHandler: Send + Sync {
    /// Handler name for logging.
    fn name(&self) -> &str;

    /// Handle one change event.
    fn on_change(&self, event: &ChangeEvent) -> Result<(), HandlerError>;
}

/// Adapts a closure into a [`ChangeHandler`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&ChangeEvent) -> Result<(), HandlerError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ChangeHandler for FnHandler<F>
where
    F: Fn(&ChangeEvent) -> Result<(), HandlerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_change(&self, event: &ChangeEvent) -> Result<(), HandlerError> {
        (self.f)(event)
    }
}
