//! GatedObserver - guarded terminal-state delivery
//!
//! Every operator delivers downstream through a gate. The gate holds
//! the observer behind a mutex-guarded state machine, which gives the
//! two guarantees of the concurrency model:
//!
//! - at most one terminal notification is ever delivered
//! - once `dispose()` returns, no further observer call can occur,
//!   even racing an in-flight upstream notification (the disposer
//!   waits on the same lock the delivery holds)
//!
//! Delivery under the lock also serializes downstream notifications,
//! so an observer never sees two calls concurrently. The flip side of
//! that guarantee: the wrapped observer must not dispose its own
//! subscription from inside a notification callback - the disposal
//! would wait on the lock its own delivery holds.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

use crate::error::FlowError;
use crate::observer::Observer;

enum GateState<T> {
    Active(Arc<dyn Observer<T>>),
    Terminated,
}

/// Terminal-state gate in front of a downstream observer
pub struct GatedObserver<T> {
    state: Mutex<GateState<T>>,
}

impl<T> GatedObserver<T> {
    /// Wrap a downstream observer
    pub fn new(observer: Arc<dyn Observer<T>>) -> Self {
        Self {
            state: Mutex::new(GateState::Active(observer)),
        }
    }

    /// Deliver an item if the gate is still active
    ///
    /// Returns whether the item was delivered.
    pub fn item(&self, item: T) -> bool {
        let guard = self.state.lock();
        match &*guard {
            GateState::Active(observer) => {
                observer.on_item(item);
                true
            }
            GateState::Terminated => false,
        }
    }

    /// Deliver completion and terminate the gate
    ///
    /// Returns `true` only for the call that actually delivered.
    pub fn complete(&self) -> bool {
        let mut guard = self.state.lock();
        match std::mem::replace(&mut *guard, GateState::Terminated) {
            GateState::Active(observer) => {
                observer.on_completed();
                true
            }
            GateState::Terminated => false,
        }
    }

    /// Deliver a failure and terminate the gate
    ///
    /// First failure wins; returns `true` only for the winning call.
    pub fn fail(&self, error: FlowError) -> bool {
        let mut guard = self.state.lock();
        match std::mem::replace(&mut *guard, GateState::Terminated) {
            GateState::Active(observer) => {
                observer.on_failed(error);
                true
            }
            GateState::Terminated => false,
        }
    }

    /// Terminate the gate without delivering anything
    ///
    /// Used by external disposal: once this returns, the downstream
    /// observer is unreachable.
    pub fn dispose(&self) {
        let mut guard = self.state.lock();
        if matches!(*guard, GateState::Active(_)) {
            trace!("delivery gate disposed");
        }
        *guard = GateState::Terminated;
    }

    /// Whether the gate still forwards notifications
    ///
    /// Racy by nature; use only as a cheap early-out, never as the
    /// correctness check (that is the lock in `item`/`complete`/`fail`).
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(*self.state.lock(), GateState::Active(_))
    }
}

impl<T> std::fmt::Debug for GatedObserver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatedObserver")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
