//! Test utilities for asserting on sequence traffic
//!
//! `ProbeObserver` records every notification it receives so tests can
//! assert on items and terminals after the fact. Use this instead of
//! mocking - it exercises the real delivery path.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::FlowError;
use crate::observer::Observer;

/// Everything a probe has seen so far
#[derive(Debug, Clone, Default)]
pub struct ProbeLog<T> {
    /// Items in delivery order
    pub items: Vec<T>,
    /// Number of completion terminals received (must end up 0 or 1)
    pub completions: usize,
    /// Failure terminals received (must end up empty or one entry)
    pub failures: Vec<FlowError>,
}

impl<T> ProbeLog<T> {
    /// Whether any terminal notification has arrived
    pub fn is_terminated(&self) -> bool {
        self.completions > 0 || !self.failures.is_empty()
    }
}

/// Recording observer for tests
#[derive(Debug, Default)]
pub struct ProbeObserver<T> {
    log: Mutex<ProbeLog<T>>,
}

impl<T: Clone + Send + Sync> ProbeObserver<T> {
    /// Create a probe with an empty log
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(ProbeLog {
                items: Vec::new(),
                completions: 0,
                failures: Vec::new(),
            }),
        })
    }

    /// Snapshot of everything received so far
    pub fn log(&self) -> ProbeLog<T> {
        self.log.lock().clone()
    }

    /// Items received so far, in delivery order
    pub fn items(&self) -> Vec<T> {
        self.log.lock().items.clone()
    }

    /// Total notification count (items + terminals)
    pub fn notification_count(&self) -> usize {
        let log = self.log.lock();
        log.items.len() + log.completions + log.failures.len()
    }

    /// Whether exactly one completion and no failure arrived
    pub fn completed_cleanly(&self) -> bool {
        let log = self.log.lock();
        log.completions == 1 && log.failures.is_empty()
    }

    /// The single failure, if one arrived
    pub fn failure(&self) -> Option<FlowError> {
        self.log.lock().failures.first().cloned()
    }
}

impl<T: Clone + Send + Sync> Observer<T> for ProbeObserver<T> {
    fn on_item(&self, item: T) {
        self.log.lock().items.push(item);
    }

    fn on_completed(&self) {
        self.log.lock().completions += 1;
    }

    fn on_failed(&self, error: FlowError) {
        self.log.lock().failures.push(error);
    }
}
