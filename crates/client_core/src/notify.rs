//! User-visible notification sink.

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Success,
    Error,
}

/// Fire-and-forget sink for toasts, status lines and the like. Controllers
/// report every completion and failure through it and never return errors to
/// the view.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

/// Sends notifications to the tracing subscriber.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Success => info!(message, "notify: success"),
            NotifyLevel::Error => warn!(message, "notify: error"),
        }
    }
}
