//! Subject - multicast push endpoint
//!
//! A `Subject` is the producer-side primitive: callers `push` items and
//! deliver one terminal, subscribers receive whatever flows through
//! while they are registered. There is no buffering and no replay - a
//! subscriber that joins late does not see earlier items.
//!
//! Subjects back the group join's per-outer-item sub-sequences and the
//! tap's tracked sequence, and serve as producers in tests.
//!
//! # Concurrency
//!
//! The subscriber registry and the terminal state live in one `RwLock`.
//! Delivery always happens outside the lock, against a snapshot of the
//! registry, so an observer callback may freely (un)subscribe or tear
//! down an operator. At most one terminal is ever delivered; callers
//! that need pushes and terminals mutually serialized (the join
//! operators do) provide their own critical section around the subject.

use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::FlowError;
use crate::observer::Observer;
use crate::sequence::{SharedSequence, Sequence};
use crate::subscription::Subscription;

struct SubjectEntry<T> {
    id: u64,
    observer: Arc<dyn Observer<T>>,
}

enum SubjectState<T> {
    Active(Vec<SubjectEntry<T>>),
    Completed,
    Failed(FlowError),
}

struct SubjectShared<T> {
    next_id: AtomicU64,
    state: RwLock<SubjectState<T>>,
}

/// Multicast push endpoint implementing [`Sequence`]
///
/// Cloning shares the endpoint: pushes through any clone reach the same
/// subscribers.
pub struct Subject<T> {
    shared: Arc<SubjectShared<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Subject<T> {
    /// Create a subject with no subscribers
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SubjectShared {
                next_id: AtomicU64::new(1),
                state: RwLock::new(SubjectState::Active(Vec::new())),
            }),
        }
    }

    /// Whether a terminal notification has been delivered
    pub fn is_terminated(&self) -> bool {
        !matches!(*self.shared.state.read(), SubjectState::Active(_))
    }

    /// Number of currently registered observers
    pub fn observer_count(&self) -> usize {
        match &*self.shared.state.read() {
            SubjectState::Active(entries) => entries.len(),
            _ => 0,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Subject<T> {
    /// Push an item to every current subscriber
    ///
    /// Returns `false` (and delivers nothing) if the subject has
    /// already terminated.
    pub fn push(&self, item: T) -> bool {
        // Snapshot the registry, deliver outside the lock: an observer
        // may (un)subscribe or tear an operator down from its callback
        let observers: Vec<_> = match &*self.shared.state.read() {
            SubjectState::Active(entries) => entries
                .iter()
                .map(|entry| Arc::clone(&entry.observer))
                .collect(),
            _ => return false,
        };

        for observer in observers {
            observer.on_item(item.clone());
        }
        true
    }

    /// Complete the subject, notifying every subscriber
    ///
    /// Returns `false` if a terminal was already delivered.
    pub fn complete(&self) -> bool {
        let mut guard = self.shared.state.write();
        match std::mem::replace(&mut *guard, SubjectState::Completed) {
            SubjectState::Active(entries) => {
                drop(guard);
                trace!(observers = entries.len(), "subject completed");
                for entry in entries {
                    entry.observer.on_completed();
                }
                true
            }
            // Keep the original terminal for late subscribers
            previous => {
                *guard = previous;
                false
            }
        }
    }

    /// Fail the subject, notifying every subscriber
    ///
    /// Returns `false` if a terminal was already delivered.
    pub fn fail(&self, error: FlowError) -> bool {
        let mut guard = self.shared.state.write();
        match std::mem::replace(&mut *guard, SubjectState::Failed(error.clone())) {
            SubjectState::Active(entries) => {
                drop(guard);
                debug!(error = %error, observers = entries.len(), "subject failed");
                for entry in entries {
                    entry.observer.on_failed(error.clone());
                }
                true
            }
            previous => {
                *guard = previous;
                false
            }
        }
    }

    /// Shared handle usable wherever a [`SharedSequence`] is expected
    pub fn handle(&self) -> SharedSequence<T> {
        Arc::new(self.clone())
    }
}

impl<T: Clone + Send + Sync + 'static> Sequence<T> for Subject<T> {
    fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        let mut guard = self.shared.state.write();
        match &mut *guard {
            SubjectState::Active(entries) => {
                let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
                entries.push(SubjectEntry { id, observer });
                drop(guard);

                let weak: Weak<SubjectShared<T>> = Arc::downgrade(&self.shared);
                Subscription::from_action(move || {
                    if let Some(shared) = weak.upgrade() {
                        if let SubjectState::Active(entries) = &mut *shared.state.write() {
                            entries.retain(|entry| entry.id != id);
                        }
                    }
                })
            }
            // Late subscriber: surface the terminal immediately
            SubjectState::Completed => {
                drop(guard);
                observer.on_completed();
                Subscription::empty()
            }
            SubjectState::Failed(error) => {
                let error = error.clone();
                drop(guard);
                observer.on_failed(error);
                Subscription::empty()
            }
        }
    }
}

impl<T> std::fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("terminated", &self.is_terminated())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "subject_test.rs"]
mod tests;
