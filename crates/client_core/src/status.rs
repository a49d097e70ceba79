//! Per-operation busy tracking.
//!
//! Each operation kind owns its own in-flight counter so the completion of
//! one request never clears the indicator of another still outstanding.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Ask,
    Upload,
    Ingest,
    List,
    Delete,
}

impl Operation {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            Operation::Ask => 0,
            Operation::Upload => 1,
            Operation::Ingest => 2,
            Operation::List => 3,
            Operation::Delete => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Ask => "ask",
            Operation::Upload => "upload",
            Operation::Ingest => "ingest",
            Operation::List => "list",
            Operation::Delete => "delete",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BusyFlags {
    pub ask: bool,
    pub upload: bool,
    pub ingest: bool,
    pub list: bool,
    pub delete: bool,
}

impl BusyFlags {
    pub fn any(&self) -> bool {
        self.ask || self.upload || self.ingest || self.list || self.delete
    }
}

#[derive(Debug, Default)]
pub struct BusyTracker {
    in_flight: [AtomicUsize; Operation::COUNT],
}

impl BusyTracker {
    pub fn begin(&self, operation: Operation) -> BusyGuard<'_> {
        let previous = self.in_flight[operation.index()].fetch_add(1, Ordering::SeqCst);
        debug!(
            operation = operation.name(),
            in_flight = previous + 1,
            "busy: request dispatched"
        );
        BusyGuard {
            tracker: self,
            operation,
        }
    }

    pub fn is_busy(&self, operation: Operation) -> bool {
        self.in_flight[operation.index()].load(Ordering::SeqCst) > 0
    }

    pub fn snapshot(&self) -> BusyFlags {
        BusyFlags {
            ask: self.is_busy(Operation::Ask),
            upload: self.is_busy(Operation::Upload),
            ingest: self.is_busy(Operation::Ingest),
            list: self.is_busy(Operation::List),
            delete: self.is_busy(Operation::Delete),
        }
    }
}

/// Clears its operation's flag when dropped, on every exit path.
pub struct BusyGuard<'a> {
    tracker: &'a BusyTracker,
    operation: Operation,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let previous =
            self.tracker.in_flight[self.operation.index()].fetch_sub(1, Ordering::SeqCst);
        debug!(
            operation = self.operation.name(),
            in_flight = previous.saturating_sub(1),
            "busy: request settled"
        );
    }
}
