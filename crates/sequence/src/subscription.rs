//! Subscription - idempotent, composable cancellation
//!
//! A `Subscription` owns a list of disposal actions (cancel an upstream
//! subscription, silence a delivery gate, drop per-item state). The
//! first `dispose()` runs every action in registration order; later
//! calls are no-ops. Actions registered after disposal run immediately,
//! so a child added during a teardown race is still cleaned up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

type DisposeAction = Box<dyn FnOnce() + Send>;

/// Cancellable handle to an active consumption of a sequence
///
/// Cloning shares the underlying handle: disposing any clone disposes
/// them all. Dropping a subscription does *not* dispose it; cancellation
/// is always explicit.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

struct SubscriptionInner {
    disposed: AtomicBool,
    actions: Mutex<Vec<DisposeAction>>,
}

impl Subscription {
    /// Create an empty composite subscription
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                disposed: AtomicBool::new(false),
                actions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A subscription with nothing to release
    pub fn empty() -> Self {
        Self::new()
    }

    /// Create a subscription from a single disposal action
    pub fn from_action(action: impl FnOnce() + Send + 'static) -> Self {
        let sub = Self::new();
        sub.add_action(action);
        sub
    }

    /// Register a disposal action
    ///
    /// Runs immediately if the subscription is already disposed.
    pub fn add_action(&self, action: impl FnOnce() + Send + 'static) {
        if self.inner.disposed.load(Ordering::Acquire) {
            action();
            return;
        }

        let mut actions = self.inner.actions.lock();
        // Re-check under the lock: dispose() drains while holding it
        if self.inner.disposed.load(Ordering::Acquire) {
            drop(actions);
            action();
        } else {
            actions.push(Box::new(action));
        }
    }

    /// Register a child subscription disposed together with this one
    pub fn add(&self, child: Subscription) {
        self.add_action(move || child.dispose());
    }

    /// Cancel the subscription
    ///
    /// Idempotent: only the first call runs the registered actions.
    pub fn dispose(&self) {
        let actions = {
            let mut guard = self.inner.actions.lock();
            if self.inner.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *guard)
        };

        for action in actions {
            action();
        }
    }

    /// Whether this subscription has been disposed
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
#[path = "subscription_test.rs"]
mod tests;
